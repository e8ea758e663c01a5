use std::panic::Location;

/// Where a stack variable was created. Purely diagnostic, printed by dumps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugOrigin {
    pub name: &'static str,
    pub file: &'static str,
    pub function: &'static str,
    pub line: u32,
}

impl DebugOrigin {
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.file.is_empty() && !self.function.is_empty() && self.line > 0
    }
}

/// The place a dump or a failed check was requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub file: &'static str,
    pub function: &'static str,
    pub line: u32,
}

impl CallSite {
    /// Call site of the `#[track_caller]` chain that reached this function, labelled with the
    /// operation name since the caller's function is unknown.
    #[track_caller]
    pub fn caller(function: &'static str) -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            function,
            line: location.line(),
        }
    }
}

/// Expands to the path of the enclosing function.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        &name[..name.len() - "::f".len()]
    }};
}

/// A [`CallSite`] for the current location.
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite {
            file: file!(),
            function: $crate::function_name!(),
            line: line!(),
        }
    };
}

/// A [`DebugOrigin`] naming `$name` at the current location.
#[macro_export]
macro_rules! origin {
    ($name:expr) => {
        $crate::DebugOrigin {
            name: $name,
            file: file!(),
            function: $crate::function_name!(),
            line: line!(),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_captures_location() {
        let origin = crate::origin!("numbers");
        assert_eq!(origin.name, "numbers");
        assert_eq!(origin.file, file!());
        assert!(origin.function.ends_with("origin_captures_location"));
        assert!(origin.line > 0);
        assert!(origin.is_complete());
    }

    #[test]
    fn default_origin_is_incomplete() {
        assert!(!DebugOrigin::default().is_complete());
        let nameless = DebugOrigin {
            name: "",
            ..crate::origin!("x")
        };
        assert!(!nameless.is_complete());
    }

    #[test]
    fn caller_points_at_the_call() {
        let line = line!() + 1;
        let site = CallSite::caller("push");
        assert_eq!(site.line, line);
        assert_eq!(site.function, "push");
    }
}
