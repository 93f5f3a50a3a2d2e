//! xflow standard library
//!
//! Native functions for the xflow engine. Every function registers itself
//! with `inventory`, so `Catalog::with_builtins()` sees all of them as long
//! as this crate is linked; [`catalog`] is the usual entry point.
//!
//! # Families
//!
//! - **value**: literals (`value.num`)
//! - **ctrl**: selection and branch pruning (`ctrl.if`, `ctrl.split`)
//! - **math**: arithmetic, rounding and comparisons
//! - **str**: splitting, joining, repetition
//! - **array**: indexing, slicing and higher-order functions with callbacks

mod args;
pub mod array;
pub mod control;
pub mod math;
pub mod string;
pub mod value;

use xflow_engine::Catalog;

/// Catalog holding every built-in function
pub fn catalog() -> Catalog {
    Catalog::with_builtins()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_collects_all_builtins() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 40, "Expected 40 built-in functions");

        // Spot-check known names
        for name in [
            "value.num",
            "ctrl.if",
            "ctrl.split",
            "math.add",
            "math.lessEq",
            "math.random",
            "str.split",
            "str.join",
            "array.at2",
            "array.sort",
            "array.map",
            "array.findIndex",
        ] {
            assert!(catalog.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_builtin_signatures_are_consistent() {
        assert!(catalog().check_consistency().is_empty());
    }
}
