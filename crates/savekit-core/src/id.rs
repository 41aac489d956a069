//! Stable handle newtypes for module graph entities.
//!
//! All handles are distinct newtype wrappers over `u32` indexing into the
//! arenas owned by [`Module`](crate::module::Module). Object identity is
//! handle identity: two handles compare equal exactly when they address the
//! same arena slot, which is what name deduplication relies on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle of a variable in a module's variable arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId(pub u32);

/// Handle of a concrete function in a module's function arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

/// Handle of a polymorphic function group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolyFunctionId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PolyFunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl VariableId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl FunctionId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl PolyFunctionId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_id_display() {
        assert_eq!(format!("{}", VariableId(7)), "7");
    }

    #[test]
    fn function_id_display() {
        assert_eq!(format!("{}", FunctionId(3)), "3");
    }

    #[test]
    fn poly_function_id_display() {
        assert_eq!(format!("{}", PolyFunctionId(0)), "0");
    }

    #[test]
    fn handles_order_by_slot() {
        let mut ids = vec![VariableId(4), VariableId(1), VariableId(2)];
        ids.sort();
        assert_eq!(ids, vec![VariableId(1), VariableId(2), VariableId(4)]);
    }

    #[test]
    fn serde_roundtrip() {
        let var = VariableId(42);
        let json = serde_json::to_string(&var).unwrap();
        assert_eq!(json, "42");
        let back: VariableId = serde_json::from_str(&json).unwrap();
        assert_eq!(var, back);

        let func = FunctionId(7);
        let json = serde_json::to_string(&func).unwrap();
        let back: FunctionId = serde_json::from_str(&json).unwrap();
        assert_eq!(func, back);
    }
}
