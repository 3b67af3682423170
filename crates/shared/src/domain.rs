use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ControlError, UnknownAdjustmentKind},
    instruction,
};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);
    };
}

id_newtype!(ControlId);

/// Highest percentage a control slot accepts.
pub const MAX_CONTROL_VALUE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentKind {
    Slow,
    Speed,
}

impl AdjustmentKind {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Slow => "SLOW",
            Self::Speed => "SPEED",
        }
    }
}

impl fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for AdjustmentKind {
    type Err = UnknownAdjustmentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SLOW" => Ok(Self::Slow),
            "SPEED" => Ok(Self::Speed),
            other => Err(UnknownAdjustmentKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub id: ControlId,
    #[serde(rename = "type")]
    pub kind: AdjustmentKind,
    pub value: u32,
    pub pitch_preserved: bool,
}

impl Control {
    pub fn new(id: u32, kind: AdjustmentKind, value: u32, pitch_preserved: bool) -> Self {
        Self {
            id: ControlId(id),
            kind,
            value,
            pitch_preserved,
        }
    }

    /// A control contributes a token only while its value is above zero.
    pub fn is_active(&self) -> bool {
        self.value > 0
    }
}

/// Fixed-membership, ordered set of controls owned by one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSet {
    controls: Vec<Control>,
}

impl Default for ControlSet {
    fn default() -> Self {
        Self {
            controls: vec![
                Control::new(1, AdjustmentKind::Slow, 0, true),
                Control::new(2, AdjustmentKind::Slow, 0, true),
                Control::new(3, AdjustmentKind::Speed, 0, true),
                Control::new(4, AdjustmentKind::Speed, 0, true),
            ],
        }
    }
}

impl ControlSet {
    pub fn new(controls: Vec<Control>) -> Result<Self, ControlError> {
        for (index, control) in controls.iter().enumerate() {
            if controls[..index].iter().any(|prior| prior.id == control.id) {
                return Err(ControlError::DuplicateControl(control.id.0));
            }
        }
        Ok(Self { controls })
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn get(&self, id: ControlId) -> Option<&Control> {
        self.controls.iter().find(|control| control.id == id)
    }

    pub fn set_value(&mut self, id: ControlId, value: u32) -> Result<(), ControlError> {
        if value > MAX_CONTROL_VALUE {
            return Err(ControlError::ValueOutOfRange {
                id: id.0,
                value,
                max: MAX_CONTROL_VALUE,
            });
        }
        self.control_mut(id)?.value = value;
        Ok(())
    }

    pub fn set_pitch(&mut self, id: ControlId, pitch_preserved: bool) -> Result<(), ControlError> {
        self.control_mut(id)?.pitch_preserved = pitch_preserved;
        Ok(())
    }

    pub fn toggle_pitch(&mut self, id: ControlId) -> Result<bool, ControlError> {
        let control = self.control_mut(id)?;
        control.pitch_preserved = !control.pitch_preserved;
        Ok(control.pitch_preserved)
    }

    pub fn active_count(&self) -> usize {
        self.controls.iter().filter(|control| control.is_active()).count()
    }

    pub fn instructions(&self) -> String {
        instruction::encode(&self.controls)
    }

    fn control_mut(&mut self, id: ControlId) -> Result<&mut Control, ControlError> {
        self.controls
            .iter_mut()
            .find(|control| control.id == id)
            .ok_or(ControlError::UnknownControl(id.0))
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
