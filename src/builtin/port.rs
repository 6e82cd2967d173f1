/// Port and signal types for module interconnection

/// A wire/signal that carries data between modules.
/// Every wire carries its own valid flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wire<T: Clone> {
  pub value: T,
  pub valid: bool,
}

impl<T: Clone> Wire<T> {
  pub fn new(value: T) -> Self {
    Self { value, valid: false }
  }

  pub fn set(&mut self, value: T) {
    self.value = value;
    self.valid = true;
  }

  pub fn clear(&mut self) {
    self.valid = false;
  }

  /// Value while valid, `None` otherwise
  pub fn get(&self) -> Option<&T> {
    if self.valid {
      Some(&self.value)
    } else {
      None
    }
  }

  /// One-shot read: returns the value if valid and drops the valid flag.
  pub fn take(&mut self) -> Option<T> {
    if self.valid {
      self.valid = false;
      Some(self.value.clone())
    } else {
      None
    }
  }
}

impl<T: Clone + Default> Default for Wire<T> {
  fn default() -> Self {
    Self {
      value: T::default(),
      valid: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_wire_take_is_one_shot() {
    let mut w: Wire<u8> = Wire::default();
    assert_eq!(w.take(), None);

    w.set(7);
    assert_eq!(w.get(), Some(&7));
    assert_eq!(w.take(), Some(7));
    assert_eq!(w.take(), None);
    // the value is kept, only the valid flag drops
    assert_eq!(w.value, 7);
  }
}
