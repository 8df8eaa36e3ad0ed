//! Logging macros.
//!
//! These forward to `defmt` when the `use-defmt` feature is enabled. Without it, or in host unit
//! tests, they compile to nothing but still borrow their arguments so no "unused" warnings appear.
#![allow(unused_macros)]

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(all(feature = "use-defmt", not(test)))]
            ::defmt::trace!($s $(, $x)*);
            #[cfg(not(all(feature = "use-defmt", not(test))))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(all(feature = "use-defmt", not(test)))]
            ::defmt::debug!($s $(, $x)*);
            #[cfg(not(all(feature = "use-defmt", not(test))))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(all(feature = "use-defmt", not(test)))]
            ::defmt::warn!($s $(, $x)*);
            #[cfg(not(all(feature = "use-defmt", not(test))))]
            let _ = ($( & $x ),*);
        }
    };
}
