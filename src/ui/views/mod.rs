pub mod guestbook;
pub mod hero;
pub mod projects;
pub mod skills;
