/// Options for [`lower`](super::lower).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LowerArgs {
    pub(super) emit_ir: bool,
    pub(super) profile: bool,
}

impl LowerArgs {
    /// Log the graph at info level before lowering.
    pub fn emit_ir(mut self) -> Self {
        self.emit_ir = true;
        self
    }

    /// Record time spent in every kernel, see
    /// [`LoweredGraph::report_profiles`](super::LoweredGraph::report_profiles).
    pub fn profile(mut self) -> Self {
        self.profile = true;
        self
    }
}
