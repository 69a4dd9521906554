use std::fmt;

/// Index into the compilation's label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelIdx(pub u32);

/// What a label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelKind {
    /// A synthetic control-flow target inside a function body.
    Code,
    /// A function entry point, carrying the source-level function name.
    Func { name: String },
}

/// A jump/call target.
///
/// Labels are identified by table index; two labels are the same label
/// iff their indices are equal. The rendered form is what appears in the
/// TAC dump and the assembly output: synthetic labels print as `_L<n>`,
/// entry labels as `_<name>`, except `main` which keeps its plain name.
#[derive(Debug, Clone)]
pub struct Label {
    pub idx: LabelIdx,
    pub kind: LabelKind,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LabelKind::Code => write!(f, "_L{}", self.idx.0),
            LabelKind::Func { name } if name == "main" => f.write_str("main"),
            LabelKind::Func { name } => write!(f, "_{name}"),
        }
    }
}

/// Owning table of all labels of one compilation.
///
/// The counter is shared by every function of the compilation and is
/// never reset in between, so rendered names are unique per compilation.
#[derive(Debug, Default)]
pub struct LabelTable {
    labels: Vec<Label>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self {
            labels: Vec::with_capacity(32),
        }
    }

    /// Allocate a synthetic control-flow label.
    pub fn new_label(&mut self) -> LabelIdx {
        let idx = LabelIdx(self.labels.len() as u32);
        self.labels.push(Label {
            idx,
            kind: LabelKind::Code,
        });
        idx
    }

    /// Allocate the entry label of a function.
    pub fn new_entry_label(&mut self, name: &str) -> LabelIdx {
        let idx = LabelIdx(self.labels.len() as u32);
        self.labels.push(Label {
            idx,
            kind: LabelKind::Func {
                name: name.to_string(),
            },
        });
        idx
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, idx: LabelIdx) -> &Label {
        &self.labels[idx.0 as usize]
    }

    /// Rendered form of a label, as used in dumps and assembly.
    pub fn render(&self, idx: LabelIdx) -> String {
        self.label(idx).to_string()
    }
}
