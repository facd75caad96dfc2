pub mod ai_interaction;
pub mod chat_session;
pub mod course;
pub mod curriculum;
pub mod dashboard;
pub mod enrollment;
pub mod faculty;
pub mod lesson;
pub mod program;
pub mod progress;
pub mod user;
