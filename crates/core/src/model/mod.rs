mod drill;
mod ids;
mod question;

pub use drill::{
    DrillConfig, DrillError, DrillOrigin, DrillSession, DrillStatus, SECONDS_PER_QUESTION,
    TimePercentage,
};
pub use ids::{DrillId, QuestionId};
pub use question::{Question, QuestionError};
