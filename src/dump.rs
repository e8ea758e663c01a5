//! Human readable pictures of a stack.
//!
//! A dump is a header naming the call site and the stack, the list of violated invariants, a table
//! of the control block and, when the stack owns a buffer, a drawing of every slot:
//!
//! ```text
//! 0x600000c04008
//!       |
//!       |
//!       V
//! #------#------#------#------#
//! |      |      |======|======|
//! |     1|     2|POISON|POISON|
//! |      |      |======|======|
//! #------#------#------#------#
//! >>>>>>>>>>>>>^
//! ```
//!
//! The arrow ends under the top of the stack. [`DumpLevel`] decides how much of the unoccupied
//! part is drawn. Dumping never touches the stack, so it is fine to dump a corrupted one.

use std::io::{self, Write};

use canary_alloc::RawAlloc;

use crate::config::{DumpLevel, DumpOptions, POISON_WIDTH};
use crate::element::Element;
use crate::integrity::Violations;
use crate::origin::CallSite;
use crate::stack::{Stack, Status};

const ERRORS_BORDER: &str = "#----------------------------------#";
const STATUS_BORDER: &str = "#---------------------------#------#";

/// Writes a dump of `stack` to `sink`.
///
/// `violations` is printed as given, usually the result of [`Stack::validate`]. `None` stands for
/// a missing stack and only prints the header and the violations.
pub fn dump<T: Element, A: RawAlloc>(
    stack: Option<&Stack<T, A>>,
    violations: Violations,
    sink: &mut dyn Write,
    site: CallSite,
    options: DumpOptions,
) -> io::Result<()> {
    writeln!(sink)?;
    writeln!(sink, "{} at {} ({}):", site.function, site.file, site.line)?;

    let stack = match stack {
        Some(stack) => stack,
        None => {
            writeln!(sink, "Stack[null]")?;
            write_violations(sink, violations)?;
            return writeln!(sink);
        }
    };

    let origin = stack.origin();
    writeln!(
        sink,
        "Stack[{:p}] \"{}\" at {} at {} ({})",
        stack,
        unset_or(origin.name),
        unset_or(origin.function),
        unset_or(origin.file),
        origin.line
    )?;
    let (control_hash, buffer_hash) = stack.hashes();
    writeln!(sink, "Hash: {} Buffer hash: {}", control_hash, buffer_hash)?;

    write_violations(sink, violations)?;
    write_status(sink, stack)?;

    let slots = stack.slots();
    if !slots.is_empty() {
        // A corrupted size must not make the drawing index out of bounds.
        let drawing = Drawing::new(slots, stack.size.min(slots.len()), options.level);
        writeln!(sink, "{:p}", stack.as_ptr())?;
        drawing.pointer(sink)?;
        drawing.border(sink)?;
        drawing.markers(sink)?;
        drawing.values(sink)?;
        drawing.markers(sink)?;
        drawing.border(sink)?;
        drawing.arrow(sink)?;
    }
    writeln!(sink)
}

/// [`dump`] into a `String`.
///
/// Writing into memory only fails when [`Element::print`] does. The dump then stops at that slot
/// and the string holds everything written before it.
pub fn dump_to_string<T: Element, A: RawAlloc>(
    stack: Option<&Stack<T, A>>,
    violations: Violations,
    site: CallSite,
    options: DumpOptions,
) -> String {
    let mut out = Vec::new();
    // A failing `print` cuts the dump short.
    let _ = dump(stack, violations, &mut out, site, options);
    String::from_utf8_lossy(&out).into_owned()
}

fn unset_or(field: &str) -> &str {
    if field.is_empty() {
        "<unset>"
    } else {
        field
    }
}

fn write_violations(sink: &mut dyn Write, violations: Violations) -> io::Result<()> {
    if violations.is_empty() {
        return writeln!(sink, "Stack is ok");
    }

    writeln!(sink, "{}", ERRORS_BORDER)?;
    writeln!(sink, "|{:<34}|", "ERRORS!!")?;
    writeln!(sink, "{}", ERRORS_BORDER)?;
    for message in violations.messages() {
        writeln!(sink, "|{:<34}|", message)?;
    }
    writeln!(sink, "{}", ERRORS_BORDER)
}

fn write_status<T: Element, A: RawAlloc>(sink: &mut dyn Write, stack: &Stack<T, A>) -> io::Result<()> {
    writeln!(sink, "{}", STATUS_BORDER)?;
    writeln!(sink, "|{:<27}|{:>6}|", "Stack capacity", stack.capacity)?;
    writeln!(sink, "|{:<27}|{:>6}|", "Stack size", stack.size)?;
    writeln!(sink, "{}", STATUS_BORDER)?;

    let flags = [
        ("Initialized", Status::INIT),
        ("Destroyed", Status::DESTROYED),
        ("Empty", Status::EMPTY),
    ];
    for (name, flag) in flags {
        let value = if stack.status.contains(flag) { "True" } else { "False" };
        writeln!(sink, "|{:<27}|{:<6}|", name, value)?;
    }
    writeln!(sink, "{}", STATUS_BORDER)
}

/// Column layout of the slot drawing.
struct Drawing<'a, T> {
    slots: &'a [T],
    size: usize,
    widths: Vec<usize>,
    level: DumpLevel,
}

impl<'a, T: Element> Drawing<'a, T> {
    fn new(slots: &'a [T], size: usize, level: DumpLevel) -> Self {
        let mid = (T::max_length() + 1) / 2;
        let widths = slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                if index >= size && slot.is_poison() {
                    POISON_WIDTH
                } else {
                    slot.length().max(mid)
                }
            })
            .collect();

        Self {
            slots,
            size,
            widths,
            level,
        }
    }

    fn unused_poison(&self, index: usize) -> bool {
        index >= self.size && self.slots[index].is_poison()
    }

    /// Points from the address line down at slot 0.
    fn pointer(&self, sink: &mut dyn Write) -> io::Result<()> {
        let pad = self.widths[0];
        writeln!(sink, "{:pad$}|", "", pad = pad)?;
        writeln!(sink, "{:pad$}|", "", pad = pad)?;
        writeln!(sink, "{:pad$}V", "", pad = pad)
    }

    fn border(&self, sink: &mut dyn Write) -> io::Result<()> {
        self.rule(sink, '#', "- ** -#", |_| '-')
    }

    /// Blank above occupied slots, `=` above unused ones.
    fn markers(&self, sink: &mut dyn Write) -> io::Result<()> {
        let size = self.size;
        self.rule(sink, '|', "  **  |", |index| if index < size { ' ' } else { '=' })
    }

    fn rule(
        &self,
        sink: &mut dyn Write,
        separator: char,
        collapsed: &str,
        fill: impl Fn(usize) -> char,
    ) -> io::Result<()> {
        let mut in_collapsed = false;
        for (index, &width) in self.widths.iter().enumerate() {
            if !in_collapsed {
                write!(sink, "{}", separator)?;
            }
            if self.level == DumpLevel::CollapseUnused && index == self.size {
                return writeln!(sink, "{}", collapsed);
            }
            if self.level == DumpLevel::CollapsePoison && self.unused_poison(index) {
                if !in_collapsed {
                    in_collapsed = true;
                    write!(sink, "{}", collapsed)?;
                }
                continue;
            }
            in_collapsed = false;
            let ch = fill(index);
            for _ in 0..width {
                write!(sink, "{}", ch)?;
            }
        }
        if !in_collapsed {
            write!(sink, "{}", separator)?;
        }
        writeln!(sink)
    }

    fn values(&self, sink: &mut dyn Write) -> io::Result<()> {
        let mut in_collapsed = false;
        for (index, slot) in self.slots.iter().enumerate() {
            if self.level == DumpLevel::CollapseUnused && index == self.size {
                return writeln!(sink, "|  **  |");
            }
            if self.unused_poison(index) {
                if self.level != DumpLevel::CollapsePoison {
                    write!(sink, "|POISON")?;
                } else if !in_collapsed {
                    in_collapsed = true;
                    write!(sink, "|  **  ")?;
                }
                continue;
            }
            in_collapsed = false;
            let pad = self.widths[index] - slot.length();
            write!(sink, "|{:pad$}", "", pad = pad)?;
            slot.print(sink)?;
        }
        writeln!(sink, "|")
    }

    /// `>` from the left edge up to a `^` under the last character of the top element.
    fn arrow(&self, sink: &mut dyn Write) -> io::Result<()> {
        if self.size == 0 {
            return Ok(());
        }
        let top = self.size - 1;
        let run = self.widths[..top].iter().map(|width| width + 1).sum::<usize>() + self.widths[top];
        write!(sink, "{}^", ">".repeat(run))
    }
}
