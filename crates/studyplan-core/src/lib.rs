//! Core logic for studyplan: the free-text task parser, the daily plan
//! generator, and the service layer that validates input and talks to the
//! store.

pub mod parser;
pub mod planner;
pub mod service;

pub use parser::{ParsedTask, parse_task_text};
pub use planner::{DailyPlan, PlanEntry, generate_plan};
pub use service::{
    CreateFromTextInput, CreateTaskInput, GeneratePlanInput, TaskInputError, TaskServiceError,
};
