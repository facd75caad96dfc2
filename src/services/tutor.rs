//! Answer resolution for the TISA tutor.
//!
//! Questions about faculty, term curricula, or the program catalog are
//! answered straight from the database. Everything else goes to the chat
//! model with a locked system prompt so the program list can never drift.

use thiserror::Error;

use crate::db::operations::curriculum::{self, CurriculumEntry};
use crate::db::operations::faculty::{self, Faculty};
use crate::db::operations::program::{self, UniversityProgram};
use crate::db::DatabaseProxy;
use crate::services::llm::{ChatMessage, LlmClient, LlmError};

/// Positions the roster lookup recognizes, most specific first. Order
/// matters: "Associate Dean" must win over "Dean".
const FACULTY_ROLES: [&str; 26] = [
    "Associate Dean",
    "Dean",
    "Chairperson",
    "Department Head, Science Department",
    "Department Head, Mathematics Department",
    "Program Chair, BS Mathematics",
    "Program Chair, BS Biology",
    "Program Chair, BS Food Technology",
    "Program Chair, BS Environmental Science",
    "Program Chair, BS Medical Technology",
    "College Extension and Services Unit (CESU) Head",
    "College Extension and Services Unit (CESU)",
    "College Research Development Unit (CRDU) Head",
    "College Research Development Unit (CRDU)",
    "Student Internship Program Coordinator",
    "College Clerk",
    "Laboratory Technician",
    "Medical Laboratory Technician",
    "Computer Laboratory Technician",
    "Professor, Science",
    "Professor, Mathematics",
    "Faculty (Part-Time), Science",
    "Faculty (Part-Time), Mathematics",
    "Assistant Professor",
    "Instructor",
    "Lecturer",
];

const LOCKED_PROGRAM_LIST: &str = r#"You are TISA, the official AI Tutor of Bulacan State University – College of Science (BSU COS).

When asked about programs, courses, or offerings in the College of Science, ALWAYS reply with this exact official list (never add, remove, or rephrase any item):

Official Undergraduate Programs – College of Science:
• Bachelor of Science in Mathematics with Specialization in Applied Statistics
• Bachelor of Science in Mathematics with Specialization in Business Applications
• Bachelor of Science in Mathematics with Specialization in Computer Science
• Bachelor of Science in Biology
• Bachelor of Science in Environmental Science
• Bachelor of Science in Food Technology
• Bachelor of Science in Medical Technology / Medical Laboratory Science

Always say: "These are the official programs offered by BSU College of Science as of 2025.""#;

const PERSONA: &str = r#"You are TISA, a clear, professional, and encouraging AI tutor for Bulacan State University students.
Use proper English at all times. Format answers with Markdown for readability.
Keep responses concise (under 200 words) and educational."#;

const PROGRAMS_OVERVIEW: &str = "**Bulacan State University – College of Science**\n\nHere are the official undergraduate programs as of 2025:\n\n• Bachelor of Science in Mathematics with Specialization in Applied Statistics  \n• Bachelor of Science in Mathematics with Specialization in Business Applications  \n• Bachelor of Science in Mathematics with Specialization in Computer Science  \n• BS Biology  \n• BS Environmental Science  \n• BS Food Technology  \n• BS Medical Technology / Medical Laboratory Science  \n\nWhich program interests you? I can provide details on curriculum, admission, or career paths.";

const PROGRAMS_FALLBACK: &str = "**BSU College of Science – Official Programs (2025)**\n\n• BS Mathematics with Specialization in Applied Statistics  \n• BS Mathematics with Specialization in Business Applications  \n• BS Mathematics with Specialization in Computer Science  \n• BS Biology  \n• BS Environmental Science  \n• BS Food Technology  \n• BS Medical Technology / Medical Laboratory Science";

const UNAVAILABLE_REPLY: &str = "The AI service is temporarily unavailable. Please try again later.";

const NO_RESPONSE_REPLY: &str = "Sorry, I could not generate a response. Please try again.";

#[derive(Debug, Error)]
enum TutorError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Produces the tutor's answer for one message. Database and model
/// failures degrade to a canned reply instead of surfacing an error.
pub async fn respond(
    proxy: &DatabaseProxy,
    llm: &LlmClient,
    message: &str,
    context: Option<&str>,
) -> String {
    let lower = message.to_lowercase();
    match resolve(proxy, llm, &lower, message, context).await {
        Ok(answer) => answer,
        Err(err) => {
            tracing::error!("tutor response failed: {err}");
            fallback_reply(&lower)
        }
    }
}

async fn resolve(
    proxy: &DatabaseProxy,
    llm: &LlmClient,
    lower: &str,
    message: &str,
    context: Option<&str>,
) -> Result<String, TutorError> {
    if let Some(role) = match_faculty_role(lower) {
        let members = faculty::list_by_position_cos(proxy, role).await?;
        return Ok(faculty_roster_reply(role, &members));
    }

    let programs = program::list_active_cos(proxy).await?;
    let matched = match_program(&programs, lower).or_else(|| {
        programs
            .iter()
            .find(|p| p.title.to_lowercase().contains("computer science"))
    });
    if let (Some(program), Some(year)) = (matched, detect_year_level(lower)) {
        let semester = detect_semester(lower);
        let entries = curriculum::list_for_program_term(proxy, &program.id, year, semester).await?;
        return Ok(if entries.is_empty() {
            missing_term_reply(program, year, semester)
        } else {
            term_subjects_reply(program, year, semester, &entries)
        });
    }

    if is_asking_about_programs(lower) {
        return Ok(PROGRAMS_OVERVIEW.to_string());
    }

    let messages = [
        ChatMessage::system(system_prompt(context)),
        ChatMessage::user(message),
    ];
    let answer = llm.chat(&messages).await?;
    if answer.is_empty() {
        return Ok(NO_RESPONSE_REPLY.to_string());
    }
    Ok(answer)
}

/// Gathers program, curriculum and faculty facts mentioned by the message
/// into the prompt context. Empty when nothing applies.
pub async fn build_context(
    proxy: &DatabaseProxy,
    message: &str,
) -> Result<Option<String>, sqlx::Error> {
    let lower = message.to_lowercase();
    let mut info = String::new();

    let programs = program::list_active_cos(proxy).await?;
    if let Some(program) = match_program(&programs, &lower) {
        info.push_str(&format!(
            "Program: {} ({}).\n",
            program.title,
            program.abbreviation.as_deref().unwrap_or_default()
        ));

        let entries = curriculum::list_by_program(proxy, &program.id).await?;
        if !entries.is_empty() {
            info.push_str("Curriculum:\n");
            let lines: Vec<String> = entries
                .iter()
                .map(|c| {
                    let prereqs = if c.prerequisites.is_empty() {
                        "None".to_string()
                    } else {
                        c.prerequisites.join(", ")
                    };
                    format!(
                        "• {} ({}), Year {}, Sem {}, Units {}, Prerequisites: {}",
                        c.course_code, c.subject_name, c.year_level, c.semester, c.units, prereqs
                    )
                })
                .collect();
            info.push_str(&lines.join("\n"));
            info.push('\n');
        }
    }

    let members = faculty::list_cos(proxy).await?;
    if !members.is_empty() {
        info.push_str("Faculty Members:\n");
        let lines: Vec<String> = members
            .iter()
            .map(|f| format!("• {}: {} {}", f.position, f.first_name, f.last_name))
            .collect();
        info.push_str(&lines.join("\n"));
        info.push('\n');
    }

    Ok(if info.is_empty() { None } else { Some(info) })
}

fn fallback_reply(lower: &str) -> String {
    if lower.contains("college of science") || lower.contains("cos") || lower.contains("programs") {
        PROGRAMS_FALLBACK.to_string()
    } else {
        UNAVAILABLE_REPLY.to_string()
    }
}

fn system_prompt(context: Option<&str>) -> String {
    let mut prompt = format!("{LOCKED_PROGRAM_LIST}\n\n{PERSONA}");
    if let Some(context) = context {
        prompt.push_str(&format!("\n\nCurrent Context: {context}"));
    }
    prompt
}

/// First recognized position mentioned in the lowercased message.
fn match_faculty_role(lower: &str) -> Option<&'static str> {
    FACULTY_ROLES
        .iter()
        .find(|role| lower.contains(&normalize_role(role)))
        .copied()
}

/// Lowercases, drops commas and collapses whitespace so the position can
/// be found inside free-form text.
fn normalize_role(role: &str) -> String {
    role.to_lowercase()
        .replace(',', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn faculty_roster_reply(role: &str, members: &[Faculty]) -> String {
    if members.is_empty() {
        return format!("There are currently no {role}s listed for the College of Science.");
    }
    let names = members
        .iter()
        .map(|f| format!("{} {}", f.first_name, f.last_name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("The {role}s of the College of Science is {names}.")
}

/// Program whose title or abbreviation appears in the lowercased message.
fn match_program<'a>(
    programs: &'a [UniversityProgram],
    lower: &str,
) -> Option<&'a UniversityProgram> {
    programs.iter().find(|p| {
        lower.contains(&p.title.to_lowercase())
            || p.abbreviation
                .as_deref()
                .is_some_and(|abbr| lower.contains(&abbr.to_lowercase()))
    })
}

/// Digits followed by an optional ordinal suffix and the word "year",
/// e.g. "3rd year" or "2 year".
fn detect_year_level(lower: &str) -> Option<i32> {
    let bytes = lower.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let mut rest = &lower[i..];
            for suffix in ["st", "nd", "rd", "th"] {
                if let Some(stripped) = rest.strip_prefix(suffix) {
                    rest = stripped;
                    break;
                }
            }
            if rest.trim_start().starts_with("year") {
                if let Ok(year) = lower[start..i].parse::<i32>() {
                    return Some(year);
                }
            }
        } else {
            i += 1;
        }
    }
    None
}

fn detect_semester(lower: &str) -> i32 {
    if lower.contains("2nd") || lower.contains("second") {
        2
    } else {
        1
    }
}

fn semester_ordinal(semester: i32) -> &'static str {
    if semester == 1 {
        "st"
    } else {
        "nd"
    }
}

fn term_subjects_reply(
    program: &UniversityProgram,
    year: i32,
    semester: i32,
    entries: &[CurriculumEntry],
) -> String {
    let listing = entries
        .iter()
        .map(|c| format!("{} ({}) - {} Units", c.course_code, c.subject_name, c.units))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "For the {} ({}), the subjects for the {}{} semester of Year {} are as follows:\n\n{}\n\nThese courses are designed to provide a strong foundational knowledge in the program.",
        program.title,
        program.abbreviation.as_deref().unwrap_or_default(),
        semester,
        semester_ordinal(semester),
        year,
        listing
    )
}

fn missing_term_reply(program: &UniversityProgram, year: i32, semester: i32) -> String {
    format!(
        "Sorry, I could not find the subjects for {} Year {}, Semester {}.",
        program.title, year, semester
    )
}

fn is_asking_about_programs(lower: &str) -> bool {
    lower.contains("college of science")
        || lower.contains("cos")
        || lower.contains("course offerings")
        || (lower.contains("programs") && lower.contains("science"))
        || lower.contains("what are the courses")
        || lower.contains("bsu cos")
        || lower.contains("offered programs")
        || lower.contains("degrees")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(title: &str, abbreviation: Option<&str>) -> UniversityProgram {
        UniversityProgram {
            id: format!("id-{title}"),
            title: title.to_string(),
            abbreviation: abbreviation.map(str::to_string),
            college: "College of Science".to_string(),
            is_active: true,
            order: 1,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn member(first: &str, last: &str, position: &str) -> Faculty {
        Faculty {
            id: format!("id-{last}"),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{last}@bulsu.edu.ph"),
            position: position.to_string(),
            college: "College of Science".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn normalizes_positions_for_matching() {
        assert_eq!(
            normalize_role("Department Head, Science Department"),
            "department head science department"
        );
        assert_eq!(normalize_role("Associate  Dean"), "associate dean");
    }

    #[test]
    fn specific_roles_win_over_shorter_ones() {
        assert_eq!(
            match_faculty_role("who is the associate dean of the college?"),
            Some("Associate Dean")
        );
        assert_eq!(match_faculty_role("who is the dean?"), Some("Dean"));
        assert_eq!(
            match_faculty_role("contact the department head science department please"),
            Some("Department Head, Science Department")
        );
        assert_eq!(match_faculty_role("when is enrollment?"), None);
    }

    #[test]
    fn year_level_parses_ordinal_forms() {
        assert_eq!(detect_year_level("subjects for 3rd year"), Some(3));
        assert_eq!(detect_year_level("2 year subjects"), Some(2));
        assert_eq!(detect_year_level("1styear curriculum"), Some(1));
        assert_eq!(detect_year_level("what about next year"), None);
        assert_eq!(detect_year_level("2nd sem of 4th year"), Some(4));
    }

    #[test]
    fn semester_defaults_to_first() {
        assert_eq!(detect_semester("3rd year subjects"), 1);
        assert_eq!(detect_semester("3rd year 2nd sem"), 2);
        assert_eq!(detect_semester("second semester of year 1"), 2);
    }

    #[test]
    fn program_matches_title_or_abbreviation() {
        let programs = vec![
            program("Bachelor of Science in Biology", None),
            program(
                "Bachelor of Science in Mathematics with Specialization in Computer Science",
                Some("BSM-CS"),
            ),
        ];
        assert_eq!(
            match_program(&programs, "tell me about the bachelor of science in biology")
                .map(|p| p.title.as_str()),
            Some("Bachelor of Science in Biology")
        );
        assert_eq!(
            match_program(&programs, "what is bsm-cs like").map(|p| p.title.as_str()),
            Some("Bachelor of Science in Mathematics with Specialization in Computer Science")
        );
        assert!(match_program(&programs, "something unrelated").is_none());
    }

    #[test]
    fn catalog_questions_are_detected() {
        assert!(is_asking_about_programs("what degrees do you offer"));
        assert!(is_asking_about_programs("programs under science?"));
        assert!(is_asking_about_programs("bsu cos offerings"));
        // Substring matching: any word containing "cos" also triggers it.
        assert!(is_asking_about_programs("explain cosine similarity"));
        assert!(!is_asking_about_programs("hello there"));
    }

    #[test]
    fn roster_reply_lists_names_in_order() {
        let members = vec![
            member("Maria", "Cruz", "Instructor"),
            member("Jose", "Reyes", "Instructor"),
        ];
        assert_eq!(
            faculty_roster_reply("Instructor", &members),
            "The Instructors of the College of Science is Maria Cruz, Jose Reyes."
        );
        assert_eq!(
            faculty_roster_reply("Lecturer", &[]),
            "There are currently no Lecturers listed for the College of Science."
        );
    }

    #[test]
    fn term_reply_formats_units_per_line() {
        let p = program("Bachelor of Science in Biology", Some("BSB"));
        let entries = vec![CurriculumEntry {
            id: "e1".to_string(),
            program_id: p.id.clone(),
            course_code: "BIO 101".to_string(),
            subject_name: "General Biology".to_string(),
            year_level: 1,
            semester: 1,
            units: 3,
            prerequisites: vec![],
            created_at: String::new(),
            updated_at: String::new(),
        }];
        let reply = term_subjects_reply(&p, 1, 1, &entries);
        assert!(reply.starts_with(
            "For the Bachelor of Science in Biology (BSB), the subjects for the 1st semester of Year 1 are as follows:"
        ));
        assert!(reply.contains("BIO 101 (General Biology) - 3 Units"));
        assert_eq!(
            missing_term_reply(&p, 2, 2),
            "Sorry, I could not find the subjects for Bachelor of Science in Biology Year 2, Semester 2."
        );
    }

    #[test]
    fn system_prompt_appends_context_when_present() {
        let bare = system_prompt(None);
        assert!(bare.contains("official AI Tutor of Bulacan State University"));
        assert!(!bare.contains("Current Context:"));

        let with = system_prompt(Some("Program: BS Biology (BSB)."));
        assert!(with.ends_with("Current Context: Program: BS Biology (BSB)."));
    }

    #[test]
    fn fallback_prefers_program_list_for_catalog_questions() {
        assert_eq!(
            fallback_reply("tell me about cos programs"),
            PROGRAMS_FALLBACK
        );
        assert_eq!(fallback_reply("explain photosynthesis"), UNAVAILABLE_REPLY);
    }
}
