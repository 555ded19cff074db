pub mod lesson;
pub mod module;
pub mod week;

pub use lesson::Lesson;
pub use module::Module;
pub use week::{WeekStatus, WeekTimetable};
