//! Requests made to the CPU while it's running
//!
//! The bus is borrowed by the CPU for the whole duration of an execution slice, so devices that
//! need to stop the slice early or change the state of an IRQ line can't call back into the CPU.
//! Instead they hold a clone of the `FrameSignal` and the CPU polls it after every instruction.

use std::cell::Cell;
use std::rc::Rc;

use crate::processor::irq::IrqLine;

#[derive(Default)]
struct Requests {
    /// Set when the current slice should end after the current instruction
    shorten: Cell<bool>,
    /// IRQ lines to assert
    assert: Cell<u8>,
    /// IRQ lines to release
    release: Cell<u8>,
}

/// Shared handle used to signal the CPU from within bus accesses
#[derive(Clone, Default)]
pub struct FrameSignal(Rc<Requests>);

impl FrameSignal {
    pub fn new() -> FrameSignal {
        FrameSignal::default()
    }

    /// Ask the CPU to end the current execution slice once the current instruction completes
    pub fn shorten_frame(&self) {
        self.0.shorten.set(true);
    }

    /// Change the state of an interrupt line. The change takes effect once the current
    /// instruction completes. If the line is both asserted and released before the CPU gets a
    /// chance to look at it the last request wins.
    pub fn set_irq_line(&self, line: IrqLine, asserted: bool) {
        let m = 1u8 << line as u8;
        let r = &self.0;

        if asserted {
            r.assert.set(r.assert.get() | m);
            r.release.set(r.release.get() & !m);
        } else {
            r.release.set(r.release.get() | m);
            r.assert.set(r.assert.get() & !m);
        }
    }

    /// Returns true if a request is waiting to be processed
    pub(crate) fn is_pending(&self) -> bool {
        let r = &self.0;

        r.shorten.get() || r.assert.get() != 0 || r.release.get() != 0
    }

    /// Retrieve and clear all pending requests
    pub(crate) fn take(&self) -> Pending {
        let r = &self.0;

        Pending {
            shorten: r.shorten.replace(false),
            assert: r.assert.replace(0),
            release: r.release.replace(0),
        }
    }
}

/// Snapshot of the requests made through a `FrameSignal`
pub(crate) struct Pending {
    pub shorten: bool,
    pub assert: u8,
    pub release: u8,
}

impl Pending {
    /// Iterate over the (line, asserted) changes requested
    pub fn irq_changes(&self) -> impl Iterator<Item = (IrqLine, bool)> + '_ {
        IrqLine::ALL.iter().filter_map(move |&line| {
            let m = 1u8 << line as u8;

            if self.assert & m != 0 {
                Some((line, true))
            } else if self.release & m != 0 {
                Some((line, false))
            } else {
                None
            }
        })
    }
}

#[test]
fn signal_is_shared_between_clones() {
    let signal = FrameSignal::new();
    let device_side = signal.clone();

    assert!(!signal.is_pending());

    device_side.shorten_frame();

    assert!(signal.is_pending());

    let p = signal.take();

    assert!(p.shorten);
    assert!(!signal.is_pending());
}

#[test]
fn signal_last_irq_request_wins() {
    let signal = FrameSignal::new();

    signal.set_irq_line(IrqLine::Irq2, true);
    signal.set_irq_line(IrqLine::Irq2, false);
    signal.set_irq_line(IrqLine::Irq5, true);

    let p = signal.take();
    let changes: Vec<_> = p.irq_changes().collect();

    assert_eq!(changes, vec![(IrqLine::Irq2, false), (IrqLine::Irq5, true)]);
}
