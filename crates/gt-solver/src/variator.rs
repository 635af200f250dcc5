//! Externally bound scalar unknowns.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// A named scalar reached through a getter/setter pair.
///
/// The variator does not own or validate the value; it only forwards reads
/// and writes, so it can bind a node parameter, a boundary value or any
/// other quantity an outer solve should drive.
pub struct Variator {
    name: String,
    get: Box<dyn Fn() -> f64>,
    set: Box<dyn FnMut(f64)>,
}

impl Variator {
    pub fn new<G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn() -> f64 + 'static,
        S: FnMut(f64) + 'static,
    {
        Self {
            name: name.into(),
            get: Box::new(get),
            set: Box::new(set),
        }
    }

    /// Variator over a shared cell, typically also captured by a node.
    pub fn from_cell(name: impl Into<String>, cell: Rc<Cell<f64>>) -> Self {
        let reader = Rc::clone(&cell);
        Self::new(name, move || reader.get(), move |v| cell.set(v))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> f64 {
        (self.get)()
    }

    pub fn set(&mut self, value: f64) {
        (self.set)(value)
    }
}

impl fmt::Debug for Variator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variator")
            .field("name", &self.name)
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_binding_reads_and_writes_through() {
        let cell = Rc::new(Cell::new(1.5));
        let mut var = Variator::from_cell("pr", Rc::clone(&cell));
        assert_eq!(var.get(), 1.5);
        var.set(-2.0);
        assert_eq!(cell.get(), -2.0);
        cell.set(7.0);
        assert_eq!(var.get(), 7.0);
        assert_eq!(var.name(), "pr");
    }

    #[test]
    fn no_validation_on_set() {
        let cell = Rc::new(Cell::new(0.0));
        let mut var = Variator::from_cell("far", Rc::clone(&cell));
        var.set(f64::NAN);
        assert!(var.get().is_nan());
    }

    #[test]
    fn closures_may_transform_the_value() {
        // percent view of a fraction
        let frac = Rc::new(Cell::new(0.25));
        let reader = Rc::clone(&frac);
        let writer = Rc::clone(&frac);
        let mut pct = Variator::new(
            "eta_pct",
            move || reader.get() * 100.0,
            move |v| writer.set(v / 100.0),
        );
        assert_eq!(pct.get(), 25.0);
        pct.set(50.0);
        assert_eq!(frac.get(), 0.5);
    }
}
