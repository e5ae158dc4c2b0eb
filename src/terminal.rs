mod bullet_points;
mod prompt;
mod spinner;

pub use bullet_points::{BulletPointPrinter, LineWriter, StdoutLineWriter};
pub use prompt::{confirm, prompt_select, prompt_with_default};
pub use spinner::with_spinner;
