//! Lexical scope frames and the stack they live on.
//!
//! A scope frame maps symbols to their currently bound values. Frames are
//! stacked in the order they were entered: index 0 is the global frame, which
//! lives as long as the interpreter, and the last frame is the innermost
//! active scope (the top of stack).
//!
//! While a frame is on the stack it is shared by reference: closures hold
//! handles to the very frames that enclosed them, so a mutation
//! made through one handle is visible through every other. Taking a detached
//! snapshot requires an explicit clone of the frame contents.

use crate::{exceptions::Exception, symbols::Symbol, value::Value};
use rustc_hash::FxHashMap;
use std::{cell::RefCell, io, rc::Rc};

/// Shared handle to a scope frame.
pub type FrameRef = Rc<RefCell<Scope>>;

/// Frame offset for an ordinary lookup, which scans every frame.
pub const ALL_FRAMES: usize = 0;

/// Frame offset for a non-global lookup, which never resolves into the global
/// frame.
pub const NON_GLOBAL: usize = 1;

/// A single lexical scope frame.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    /// Local bindings. Keyed by symbol identity.
    bindings: FxHashMap<Symbol, Value>,

    /// Set for the bottom-most, interpreter-lifetime frame only.
    is_global: bool,
}

impl Scope {
    /// Create a new, empty, non-global frame.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn global() -> Self {
        Self {
            bindings: Default::default(),
            is_global: true,
        }
    }

    pub fn is_global(&self) -> bool {
        self.is_global
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bind a symbol in this frame, replacing any existing binding.
    pub fn bind(&mut self, symbol: &Symbol, value: Value) {
        self.bindings.insert(symbol.clone(), value);
    }

    /// Replace the value of a symbol already bound in this frame. Never
    /// creates a new binding.
    pub fn update(&mut self, symbol: &Symbol, value: Value) -> Result<(), Exception> {
        match self.bindings.get_mut(symbol) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Exception::unbound_symbol(symbol)),
        }
    }

    /// Look up a symbol in this frame only.
    pub fn lookup_local(&self, symbol: &Symbol) -> Option<Value> {
        self.bindings.get(symbol).cloned()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.bindings.contains_key(symbol)
    }

    /// Write a human-readable listing of this frame.
    ///
    /// The global frame is summarized in a single line unless `show_global`
    /// is set, since it usually holds every builtin.
    pub fn show(&self, out: &mut dyn io::Write, indent: usize, label: &str, show_global: bool) -> io::Result<()> {
        let rep = " ".repeat(indent);
        let rep4 = " ".repeat(indent + 4);

        writeln!(out, "{} {}", rep, label)?;

        if self.is_global && !show_global {
            return writeln!(out, "{} (global scope - omitting content for brevity)", rep4);
        }

        if self.bindings.is_empty() {
            return writeln!(out, "{} empty-scope: no symbols", rep4);
        }

        let mut entries = self
            .bindings
            .iter()
            .map(|(symbol, value)| (symbol.name(), format!("{:?}", value)))
            .collect::<Vec<_>>();
        entries.sort();

        for (name, value) in entries {
            writeln!(out, "{} {} -> {}", rep4, name, value)?;
        }

        Ok(())
    }
}

/// The stack of scope frames owned by an interpreter.
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<FrameRef>,

    /// Dump every frame through the logger whenever a lookup fails.
    pub(crate) dump_on_miss: bool,

    /// Include the contents of the global frame in dumps.
    pub(crate) show_global: bool,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// Create a stack holding only a fresh global frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Rc::new(RefCell::new(Scope::global()))],
            dump_on_miss: false,
            show_global: false,
        }
    }

    /// Number of frames on the stack.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The innermost frame, if any.
    pub fn top(&self) -> Option<&FrameRef> {
        self.frames.last()
    }

    /// The global frame, if it is still on the stack.
    pub fn global(&self) -> Option<&FrameRef> {
        self.frames.first().filter(|frame| frame.borrow().is_global())
    }

    /// Iterate over frames from the outermost to the innermost.
    pub fn frames(&self) -> impl DoubleEndedIterator<Item = &FrameRef> {
        self.frames.iter()
    }

    /// Enter a new, empty, non-global scope.
    pub fn push_new_frame(&mut self) {
        self.frames.push(Rc::new(RefCell::new(Scope::new())));
        log::trace!("pushed scope frame, depth is now {}", self.frames.len());
    }

    /// Leave the innermost scope.
    ///
    /// The global frame is not protected here; keeping it on the stack is the
    /// caller's responsibility.
    pub fn pop_frame(&mut self) -> Result<(), Exception> {
        match self.frames.pop() {
            Some(_) => {
                log::trace!("popped scope frame, depth is now {}", self.frames.len());
                Ok(())
            }
            None => Err(Exception::empty_stack()),
        }
    }

    /// Bind a symbol in the innermost frame.
    pub fn bind_in_top(&mut self, symbol: &Symbol, value: Value) -> Result<(), Exception> {
        match self.frames.last() {
            Some(frame) => {
                frame.borrow_mut().bind(symbol, value);
                Ok(())
            }
            None => Err(Exception::empty_stack()),
        }
    }

    /// Resolve a symbol, returning its value and the frame that owns it.
    ///
    /// Frames are scanned innermost first, so inner bindings shadow outer
    /// ones. The bottom `min_frame_offset` frames are excluded from the scan:
    /// counting `i` from the top, offsets `0 ..= tos - min_frame_offset` are
    /// visited.
    pub fn lookup(&self, symbol: &Symbol, min_frame_offset: usize) -> Result<(Value, FrameRef), Exception> {
        match self.find(symbol, min_frame_offset) {
            Some(found) => Ok(found),
            None => {
                if self.dump_on_miss {
                    self.log_dump(symbol);
                }

                Err(Exception::symbol_not_found(symbol))
            }
        }
    }

    /// Ordinary lookup, scanning every frame including the global one.
    pub fn lookup_symbol(&self, symbol: &Symbol) -> Result<(Value, FrameRef), Exception> {
        self.lookup(symbol, ALL_FRAMES)
    }

    /// Lookup used when building closures. Never resolves into the global
    /// frame, since globals are always reachable without being captured.
    pub fn lookup_symbol_non_global(&self, symbol: &Symbol) -> Result<(Value, FrameRef), Exception> {
        self.lookup(symbol, NON_GLOBAL)
    }

    /// Same scan as [`ScopeStack::lookup`], without the miss diagnostics.
    pub(crate) fn find(&self, symbol: &Symbol, min_frame_offset: usize) -> Option<(Value, FrameRef)> {
        self.frames
            .iter()
            .skip(min_frame_offset)
            .rev()
            .find_map(|frame| frame.borrow().lookup_local(symbol).map(|value| (value, frame.clone())))
    }

    /// Assign a new value to a symbol that is already bound somewhere on the
    /// stack, in the innermost frame that owns it. Fails without modifying any
    /// frame when no frame owns the symbol.
    pub fn update_existing(&mut self, symbol: &Symbol, value: Value) -> Result<(), Exception> {
        for frame in self.frames.iter().rev() {
            if frame.borrow().contains(symbol) {
                return frame.borrow_mut().update(symbol, value);
            }
        }

        Err(Exception::unbound_symbol(symbol))
    }

    /// Write every frame, innermost first.
    pub fn show(&self, out: &mut dyn io::Write, indent: usize) -> io::Result<()> {
        let tos = self.frames.len().saturating_sub(1);

        writeln!(out, "{}scope stack (depth {}):", " ".repeat(indent), self.frames.len())?;

        for (i, frame) in self.frames.iter().enumerate().rev() {
            let label = if i == tos {
                format!("scope {} (top)", i)
            } else {
                format!("scope {}", i)
            };

            frame.borrow().show(out, indent + 2, &label, self.show_global)?;
        }

        Ok(())
    }

    fn log_dump(&self, symbol: &Symbol) {
        let mut dump = Vec::new();

        if self.show(&mut dump, 0).is_ok() {
            log::debug!("symbol {} not found; {}", symbol, String::from_utf8_lossy(&dump).trim_end());
        }
    }

    /// Detach every frame above the global one, leaving the global frame in
    /// place. Used when entering a closure body.
    pub(crate) fn take_locals(&mut self) -> Vec<FrameRef> {
        let keep = self.frames.len().min(1);
        self.frames.split_off(keep)
    }

    /// Replace every frame above the global one with the given frames.
    pub(crate) fn restore_locals(&mut self, locals: Vec<FrameRef>) {
        self.frames.truncate(1);
        self.frames.extend(locals);
    }

    pub(crate) fn push_frame(&mut self, frame: FrameRef) {
        self.frames.push(frame);
    }

    pub(crate) fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }
}
