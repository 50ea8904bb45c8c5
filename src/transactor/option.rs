//! Transaction options applied before a session begins.

/// A value that configures a driver-specific options struct `O`.
///
/// Closures taking `&mut O` are options, so callers can write
/// `&|o: &mut TxOptions| o.read_only = true` inline.
pub trait TxOption<O> {
    /// Apply this option to `options`.
    fn apply(&self, options: &mut O);
}

impl<O, F> TxOption<O> for F
where
    F: Fn(&mut O),
{
    fn apply(&self, options: &mut O) {
        self(options)
    }
}

/// Build an options value by applying `options` in order to `O::default()`.
///
/// Later options win when several touch the same field.
pub fn apply_options<O: Default>(options: &[&dyn TxOption<O>]) -> O {
    let mut built = O::default();
    for option in options {
        option.apply(&mut built);
    }
    built
}
