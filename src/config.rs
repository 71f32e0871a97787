//! Caller-configurable knobs, grounded on the teacher's own
//! `deserialize::PdfParseOptions` (a single `fail_on_error` switch plus a
//! `Vec<PdfWarnMsg>` side channel). We generalize the same shape to every
//! bound this crate enforces, rather than leaving them as scattered
//! private constants each module picks for itself.

/// Hard ceilings the parser and interpreter refuse to exceed, each
/// guarding against a specific pathological or hostile input (§7):
/// a `/Prev` chain that never terminates, a self-referential Form
/// XObject, a runaway operand stack from a malformed content stream, an
/// unbounded `q` nesting, and an `/ObjStm` claiming an absurd `/N`.
///
/// The `Default` values match the limits this crate has always enforced
/// internally; callers with unusually large legitimate documents (deep
/// nested forms, huge object streams) can raise them explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limits {
    pub max_prev_chain: usize,
    pub max_form_depth: usize,
    pub max_operand_stack_depth: usize,
    pub max_graphics_state_depth: usize,
    pub max_objstm_subobjects: usize,
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            max_prev_chain: crate::xref::MAX_PREV_CHAIN,
            max_form_depth: crate::interpreter::MAX_FORM_DEPTH,
            max_operand_stack_depth: crate::content::parser::MAX_OPERAND_STACK_DEPTH,
            max_graphics_state_depth: crate::graphics_state::MAX_GRAPHICS_STATE_DEPTH,
            max_objstm_subobjects: crate::document::MAX_OBJSTM_SUBOBJECTS,
        }
    }
}

/// Options governing how `Document::load_with_options` and
/// `ContentInterpreter::with_options` behave.
///
/// `fail_on_error` mirrors the teacher's field of the same name: with it
/// `false` (the default), tier-2/3 recoverable conditions (§7) are
/// logged via `log::warn!` and skipped; with it `true`, the same
/// conditions are promoted to a hard `Err`, for callers doing strict
/// document validation rather than best-effort extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseOptions {
    /// Tried only if the document's `/Encrypt` dictionary is present;
    /// pass `Vec::new()` for the common empty-user-password case.
    pub password: Vec<u8>,
    pub fail_on_error: bool,
    pub limits: Limits,
}

impl Default for ParseOptions {
    fn default() -> ParseOptions {
        ParseOptions { password: Vec::new(), fail_on_error: false, limits: Limits::default() }
    }
}

impl ParseOptions {
    pub fn with_password(password: &[u8]) -> ParseOptions {
        ParseOptions { password: password.to_vec(), ..ParseOptions::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_modules_own_constants() {
        let limits = Limits::default();
        assert_eq!(limits.max_prev_chain, crate::xref::MAX_PREV_CHAIN);
        assert_eq!(limits.max_form_depth, crate::interpreter::MAX_FORM_DEPTH);
    }

    #[test]
    fn with_password_leaves_other_fields_default() {
        let opts = ParseOptions::with_password(b"secret");
        assert_eq!(opts.password, b"secret");
        assert!(!opts.fail_on_error);
        assert_eq!(opts.limits, Limits::default());
    }
}
