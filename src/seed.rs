use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::db::operations::user::{self, NewUser};
use crate::db::DatabaseProxy;

struct TestAccount {
    email: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    password: &'static str,
    role: &'static str,
}

const TEST_ACCOUNTS: &[TestAccount] = &[
    TestAccount {
        email: "student@example.com",
        first_name: "Test",
        last_name: "Student",
        password: "TestPass123!",
        role: "STUDENT",
    },
    TestAccount {
        email: "teacher@example.com",
        first_name: "Test",
        last_name: "Teacher",
        password: "TeacherPass123!",
        role: "TEACHER",
    },
    TestAccount {
        email: "admin@example.com",
        first_name: "Test",
        last_name: "Admin",
        password: "AdminPass123!",
        role: "ADMIN",
    },
];

/// Ensures the fixed accounts the integration suites log in with exist.
/// Only active under `NODE_ENV=test`.
pub async fn seed_test_accounts(proxy: &DatabaseProxy) {
    let node_env = std::env::var("NODE_ENV").unwrap_or_default();
    if node_env != "test" {
        return;
    }

    tracing::info!("NODE_ENV=test detected, seeding test accounts...");

    for account in TEST_ACCOUNTS {
        match user::find_by_email(proxy, account.email).await {
            Ok(Some(_)) => {
                tracing::debug!(email = account.email, "test account already exists");
                continue;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, email = account.email, "failed to look up test account");
                continue;
            }
        }

        let password_hash = match bcrypt::hash(account.password, 10) {
            Ok(hash) => hash,
            Err(err) => {
                tracing::warn!(error = %err, email = account.email, "failed to hash password");
                continue;
            }
        };

        let new_user = NewUser {
            email: account.email.to_string(),
            password_hash,
            first_name: account.first_name.to_string(),
            last_name: account.last_name.to_string(),
            role: account.role.to_string(),
            learning_style: None,
            grade_level: None,
        };

        match user::insert_user(proxy, &new_user).await {
            Ok(created) => {
                if let Err(err) =
                    user::create_default_accessibility_settings(proxy, &created.id).await
                {
                    tracing::warn!(error = %err, email = account.email, "failed to seed accessibility settings");
                }
                tracing::info!(email = account.email, role = account.role, "seeded test account");
            }
            Err(err) => {
                tracing::warn!(error = %err, email = account.email, "failed to seed test account");
            }
        }
    }
}

const DEMO_ADMIN_EMAIL: &str = "admin@ailearning.com";

/// Seeds the demo dataset (users, two courses with lessons, enrollments,
/// sample AI history) when `SEED_DEMO_DATA=true`. The presence of the demo
/// admin account marks the dataset as already applied.
pub async fn seed_demo_data(proxy: &DatabaseProxy) {
    if !demo_seed_enabled() {
        return;
    }

    match user::find_by_email(proxy, DEMO_ADMIN_EMAIL).await {
        Ok(Some(_)) => {
            tracing::debug!("demo dataset already present");
            return;
        }
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(error = %err, "failed to check for existing demo data");
            return;
        }
    }

    tracing::info!("SEED_DEMO_DATA=true, seeding demo dataset...");

    match insert_demo_dataset(proxy).await {
        Ok(()) => tracing::info!("demo dataset seeded"),
        Err(err) => tracing::warn!(error = %err, "failed to seed demo dataset"),
    }
}

fn demo_seed_enabled() -> bool {
    std::env::var("SEED_DEMO_DATA")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

async fn insert_demo_dataset(proxy: &DatabaseProxy) -> Result<(), sqlx::Error> {
    user::insert_user(
        proxy,
        &NewUser {
            email: DEMO_ADMIN_EMAIL.to_string(),
            password_hash: bcrypt::hash("admin123", 10).unwrap_or_default(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            role: "ADMIN".to_string(),
            learning_style: None,
            grade_level: None,
        },
    )
    .await?;

    let teacher = user::insert_user(
        proxy,
        &NewUser {
            email: "teacher@ailearning.com".to_string(),
            password_hash: bcrypt::hash("teacher123", 10).unwrap_or_default(),
            first_name: "Sarah".to_string(),
            last_name: "Johnson".to_string(),
            role: "TEACHER".to_string(),
            learning_style: None,
            grade_level: None,
        },
    )
    .await?;

    let student_password = bcrypt::hash("student123", 10).unwrap_or_default();

    let student1 = user::insert_user(
        proxy,
        &NewUser {
            email: "student1@ailearning.com".to_string(),
            password_hash: student_password.clone(),
            first_name: "Alex".to_string(),
            last_name: "Martinez".to_string(),
            role: "STUDENT".to_string(),
            learning_style: Some("VISUAL".to_string()),
            grade_level: Some("10".to_string()),
        },
    )
    .await?;

    let student2 = user::insert_user(
        proxy,
        &NewUser {
            email: "student2@ailearning.com".to_string(),
            password_hash: student_password,
            first_name: "Jordan".to_string(),
            last_name: "Lee".to_string(),
            role: "STUDENT".to_string(),
            learning_style: Some("AUDITORY".to_string()),
            grade_level: Some("11".to_string()),
        },
    )
    .await?;

    // Student 1 is a visual learner with dyslexia-friendly settings.
    let now = Utc::now().naive_utc();
    sqlx::query(
        r#"
        INSERT INTO "accessibility_settings" (
            "id", "userId", "fontSize", "fontFamily", "colorScheme",
            "textToSpeechEnabled", "ttsSpeed", "captionsEnabled",
            "transcriptsEnabled", "createdAt", "updatedAt"
        ) VALUES ($1, $2, 18, 'OpenDyslexic', 'dyslexia', TRUE, 1.2, TRUE, TRUE, $3, $3)
        ON CONFLICT ("userId") DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&student1.id)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    let math_course = insert_demo_course(
        proxy,
        "Introduction to Algebra",
        "Learn fundamental algebraic concepts with AI-powered personalized learning paths. Perfect for beginners!",
        480,
        &["Math", "Algebra", "Beginner", "STEM"],
        &teacher.id,
    )
    .await?;

    insert_demo_lesson(
        proxy,
        DemoLesson {
            course_id: &math_course,
            order: 1,
            title: "Welcome to Algebra",
            description: "Introduction to algebraic thinking and basic concepts",
            lesson_type: "VIDEO",
            content: json!({
                "videoId": "intro-algebra-001",
                "description": "Learn what algebra is and why it matters",
                "keyPoints": ["Variables and constants", "Expressions", "Equations"],
            }),
            video_url: Some("https://example.com/videos/intro-algebra.mp4"),
            transcript: Some(
                "Welcome to Introduction to Algebra. In this lesson, we will explore what algebra is...",
            ),
            duration: 15,
        },
    )
    .await?;

    insert_demo_lesson(
        proxy,
        DemoLesson {
            course_id: &math_course,
            order: 2,
            title: "Variables and Expressions",
            description: "Understanding variables, constants, and algebraic expressions",
            lesson_type: "INTERACTIVE",
            content: json!({
                "exercises": [
                    { "question": "What is a variable?", "type": "multiple-choice" },
                    { "question": "Simplify: 2x + 3x", "type": "short-answer" },
                ],
            }),
            video_url: None,
            transcript: None,
            duration: 20,
        },
    )
    .await?;

    insert_demo_lesson(
        proxy,
        DemoLesson {
            course_id: &math_course,
            order: 3,
            title: "Solving Simple Equations",
            description: "Learn to solve one-step and two-step equations",
            lesson_type: "VIDEO",
            content: json!({
                "videoId": "solving-equations-001",
                "examples": ["x + 5 = 12", "2x = 10", "3x - 4 = 11"],
            }),
            video_url: Some("https://example.com/videos/solving-equations.mp4"),
            transcript: Some("Now lets learn how to solve simple equations step by step..."),
            duration: 25,
        },
    )
    .await?;

    let science_course = insert_demo_course(
        proxy,
        "Biology Basics: Cell Structure",
        "Explore the fascinating world of cells with interactive 3D models and AI tutor support",
        360,
        &["Science", "Biology", "Cells", "Life Science"],
        &teacher.id,
    )
    .await?;

    insert_demo_lesson(
        proxy,
        DemoLesson {
            course_id: &science_course,
            order: 1,
            title: "Introduction to Cells",
            description: "What are cells and why are they important?",
            lesson_type: "VIDEO",
            content: json!({
                "videoId": "intro-cells-001",
                "description": "Discover the building blocks of life",
            }),
            video_url: Some("https://example.com/videos/intro-cells.mp4"),
            transcript: Some(
                "Cells are the basic unit of life. Every living organism is made of cells...",
            ),
            duration: 18,
        },
    )
    .await?;

    insert_demo_lesson(
        proxy,
        DemoLesson {
            course_id: &science_course,
            order: 2,
            title: "Cell Parts and Functions",
            description: "Learn about organelles and their roles",
            lesson_type: "INTERACTIVE",
            content: json!({
                "interactiveModel": "3d-cell-model",
                "organelles": ["nucleus", "mitochondria", "cell membrane", "cytoplasm"],
            }),
            video_url: None,
            transcript: None,
            duration: 30,
        },
    )
    .await?;

    insert_demo_enrollment(proxy, &student1.id, &math_course, 33.33, true).await?;
    insert_demo_enrollment(proxy, &student2.id, &math_course, 0.0, false).await?;
    insert_demo_enrollment(proxy, &student1.id, &science_course, 50.0, true).await?;

    let math_context = format!("Course: {math_course}");
    insert_demo_interaction(
        proxy,
        &student1.id,
        "QUESTION",
        &math_context,
        "Can you explain what a variable is in simple terms?",
        "Of course! A variable is like a container or box that can hold different values. \
         Think of it like a backpack - you can put different things in it at different times. \
         In math, we use letters like x, y, or z to represent these containers. \
         For example, if x = 5, then x is our variable and 5 is the value it currently holds.",
    )
    .await?;

    insert_demo_interaction(
        proxy,
        &student1.id,
        "HINT",
        &math_context,
        "I'm stuck on solving 2x + 3 = 11",
        "Great question! Here's a hint: Start by getting all the numbers on one side and the \
         variable on the other. What would you subtract from both sides first to isolate the \
         term with x?",
    )
    .await?;

    sqlx::query(
        r#"
        INSERT INTO "achievements" ("id", "userId", "type", "title", "description", "icon", "points")
        VALUES ($1, $2, 'COURSE_COMPLETION', 'First Lesson Complete!',
                'Completed your first lesson in Introduction to Algebra', $3, 10)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&student1.id)
    .bind("\u{1F3AF}")
    .execute(proxy.pool())
    .await?;

    let group_id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO "study_groups" ("id", "name", "description", "courseId", "maxMembers", "createdAt", "updatedAt")
        VALUES ($1, 'Algebra Study Buddies', 'A group for students learning algebra together', $2, 10, $3, $3)
        "#,
    )
    .bind(&group_id)
    .bind(&math_course)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    for (member_id, member_role) in [(&student1.id, "admin"), (&student2.id, "member")] {
        sqlx::query(
            r#"
            INSERT INTO "study_group_members" ("id", "groupId", "userId", "role")
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&group_id)
        .bind(member_id)
        .bind(member_role)
        .execute(proxy.pool())
        .await?;
    }

    insert_demo_notification(
        proxy,
        &student1.id,
        "Welcome to AI Inclusive Learning!",
        "Start your learning journey with personalized AI-powered education",
        "info",
        "/dashboard",
    )
    .await?;

    let course_link = format!("/courses/{math_course}");
    insert_demo_notification(
        proxy,
        &student1.id,
        "New Lesson Available",
        "Check out \"Solving Simple Equations\" in your Algebra course",
        "success",
        &course_link,
    )
    .await?;

    Ok(())
}

async fn insert_demo_course(
    proxy: &DatabaseProxy,
    title: &str,
    description: &str,
    duration: i32,
    tags: &[&str],
    teacher_id: &str,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let tags: Vec<String> = tags.iter().map(|tag| tag.to_string()).collect();

    sqlx::query(
        r#"
        INSERT INTO "courses" (
            "id", "title", "description", "level", "status", "duration",
            "price", "tags", "creatorId", "teacherId", "createdAt", "updatedAt"
        ) VALUES ($1, $2, $3, 'BEGINNER', 'PUBLISHED', $4, 0, $5, $6, $6, $7, $7)
        "#,
    )
    .bind(&id)
    .bind(title)
    .bind(description)
    .bind(duration)
    .bind(&tags)
    .bind(teacher_id)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(id)
}

struct DemoLesson<'a> {
    course_id: &'a str,
    order: i32,
    title: &'a str,
    description: &'a str,
    lesson_type: &'a str,
    content: serde_json::Value,
    video_url: Option<&'a str>,
    transcript: Option<&'a str>,
    duration: i32,
}

async fn insert_demo_lesson(
    proxy: &DatabaseProxy,
    lesson: DemoLesson<'_>,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        INSERT INTO "lessons" (
            "id", "courseId", "title", "description", "type", "content",
            "videoUrl", "transcript", "duration", "order", "isPublished",
            "createdAt", "updatedAt"
        ) VALUES ($1, $2, $3, $4, $5::"LessonType", $6, $7, $8, $9, $10, TRUE, $11, $11)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(lesson.course_id)
    .bind(lesson.title)
    .bind(lesson.description)
    .bind(lesson.lesson_type)
    .bind(lesson.content.to_string())
    .bind(lesson.video_url)
    .bind(lesson.transcript)
    .bind(lesson.duration)
    .bind(lesson.order)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(())
}

async fn insert_demo_enrollment(
    proxy: &DatabaseProxy,
    user_id: &str,
    course_id: &str,
    progress: f64,
    accessed: bool,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().naive_utc();
    let last_accessed = accessed.then_some(now);

    sqlx::query(
        r#"
        INSERT INTO "enrollments" ("id", "userId", "courseId", "progress", "enrolledAt", "lastAccessedAt")
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT ("userId", "courseId") DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(course_id)
    .bind(progress)
    .bind(now)
    .bind(last_accessed)
    .execute(proxy.pool())
    .await?;

    Ok(())
}

async fn insert_demo_interaction(
    proxy: &DatabaseProxy,
    user_id: &str,
    interaction_type: &str,
    context: &str,
    user_message: &str,
    ai_response: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "ai_interactions" ("id", "userId", "type", "context", "userMessage", "aiResponse", "helpful")
        VALUES ($1, $2, $3::"AIInteractionType", $4, $5, $6, TRUE)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(interaction_type)
    .bind(context)
    .bind(user_message)
    .bind(ai_response)
    .execute(proxy.pool())
    .await?;

    Ok(())
}

async fn insert_demo_notification(
    proxy: &DatabaseProxy,
    user_id: &str,
    title: &str,
    message: &str,
    kind: &str,
    link: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "notifications" ("id", "userId", "title", "message", "type", "link")
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(kind)
    .bind(link)
    .execute(proxy.pool())
    .await?;

    Ok(())
}
