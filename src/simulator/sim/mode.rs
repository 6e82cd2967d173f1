#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepMode {
  #[default]
  Continuous,
  Step,
}

impl StepMode {
  pub fn from_flag(step: bool) -> Self {
    if step {
      StepMode::Step
    } else {
      StepMode::Continuous
    }
  }
}
