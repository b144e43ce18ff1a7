//! 模式标识与注册表
//!
//! 内建模式是封闭枚举；自定义模式占用运行期分配的扩展区间。
//! 模式 → 构造器的映射是注入的配置数据，不是全局可变状态，
//! 也没有任何反射：自定义变体通过注册工厂闭包接入。

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::services::config::ToolConfig;

use super::state::TransitionContext;
use super::tool::ToolVariant;

/// The closed built-in mode set (mirrors the full interactive surface of
/// the original viewer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolMode {
    Pan,
    AnnotEdit,
    AnnotEditLine,
    AnnotEditTextMarkup,
    AnnotEditRectGroup,
    AnnotEditAdvancedShape,
    TextSelect,
    FormFill,
    LinkAction,
    LineCreate,
    ArrowCreate,
    RulerCreate,
    RectCreate,
    OvalCreate,
    PolylineCreate,
    PolygonCreate,
    CloudCreate,
    InkCreate,
    InkEraser,
    StickyNoteCreate,
    FreeTextCreate,
    CalloutCreate,
    TextHighlightCreate,
    TextUnderlineCreate,
    TextSquigglyCreate,
    TextStrikeoutCreate,
    TextRedactionCreate,
    TextHighlighter,
    FreeHighlighter,
    TextLinkCreate,
    RectLinkCreate,
    Signature,
    Stamper,
    RubberStamper,
    SoundCreate,
    FileAttachmentCreate,
    FormTextFieldCreate,
    FormCheckboxCreate,
    FormRadioGroupCreate,
    FormSignatureCreate,
    RichMedia,
    DigitalSignature,
}

impl ToolMode {
    /// The annotation-editor family; these modes share gesture semantics
    /// and differ only in which annotation kinds they are entered for.
    pub fn is_annot_edit(self) -> bool {
        matches!(
            self,
            ToolMode::AnnotEdit
                | ToolMode::AnnotEditLine
                | ToolMode::AnnotEditTextMarkup
                | ToolMode::AnnotEditRectGroup
                | ToolMode::AnnotEditAdvancedShape
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolMode::Pan => "pan",
            ToolMode::AnnotEdit => "annot_edit",
            ToolMode::AnnotEditLine => "annot_edit_line",
            ToolMode::AnnotEditTextMarkup => "annot_edit_text_markup",
            ToolMode::AnnotEditRectGroup => "annot_edit_rect_group",
            ToolMode::AnnotEditAdvancedShape => "annot_edit_advanced_shape",
            ToolMode::TextSelect => "text_select",
            ToolMode::FormFill => "form_fill",
            ToolMode::LinkAction => "link_action",
            ToolMode::LineCreate => "line_create",
            ToolMode::ArrowCreate => "arrow_create",
            ToolMode::RulerCreate => "ruler_create",
            ToolMode::RectCreate => "rect_create",
            ToolMode::OvalCreate => "oval_create",
            ToolMode::PolylineCreate => "polyline_create",
            ToolMode::PolygonCreate => "polygon_create",
            ToolMode::CloudCreate => "cloud_create",
            ToolMode::InkCreate => "ink_create",
            ToolMode::InkEraser => "ink_eraser",
            ToolMode::StickyNoteCreate => "sticky_note_create",
            ToolMode::FreeTextCreate => "free_text_create",
            ToolMode::CalloutCreate => "callout_create",
            ToolMode::TextHighlightCreate => "text_highlight",
            ToolMode::TextUnderlineCreate => "text_underline",
            ToolMode::TextSquigglyCreate => "text_squiggly",
            ToolMode::TextStrikeoutCreate => "text_strikeout",
            ToolMode::TextRedactionCreate => "text_redaction",
            ToolMode::TextHighlighter => "text_highlighter",
            ToolMode::FreeHighlighter => "free_highlighter",
            ToolMode::TextLinkCreate => "text_link_create",
            ToolMode::RectLinkCreate => "rect_link_create",
            ToolMode::Signature => "signature",
            ToolMode::Stamper => "stamper",
            ToolMode::RubberStamper => "rubber_stamper",
            ToolMode::SoundCreate => "sound_create",
            ToolMode::FileAttachmentCreate => "file_attachment_create",
            ToolMode::FormTextFieldCreate => "form_text_field_create",
            ToolMode::FormCheckboxCreate => "form_checkbox_create",
            ToolMode::FormRadioGroupCreate => "form_radio_group_create",
            ToolMode::FormSignatureCreate => "form_signature_create",
            ToolMode::RichMedia => "rich_media",
            ToolMode::DigitalSignature => "digital_signature",
        }
    }
}

/// Opaque, comparable mode identifier: the closed built-in set plus the
/// runtime-extensible custom range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeId {
    Builtin(ToolMode),
    Custom(u16),
}

impl ModeId {
    /// The neutral (pan) mode.
    pub const NEUTRAL: ModeId = ModeId::Builtin(ToolMode::Pan);

    pub fn is_neutral(self) -> bool {
        self == Self::NEUTRAL
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeId::Builtin(mode) => write!(f, "{}", mode.label()),
            ModeId::Custom(id) => write!(f, "custom:{}", id),
        }
    }
}

#[derive(Debug)]
pub enum ToolCreateError {
    /// The mode has no built-in handler and no registered factory.
    NoHandler(ModeId),
    /// A registered factory failed (resource exhaustion, bad config, ...).
    FactoryFailed(ModeId, String),
}

impl fmt::Display for ToolCreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolCreateError::NoHandler(mode) => {
                write!(f, "no tool variant registered for mode {}", mode)
            }
            ToolCreateError::FactoryFailed(mode, msg) => {
                write!(f, "factory for mode {} failed: {}", mode, msg)
            }
        }
    }
}

impl std::error::Error for ToolCreateError {}

pub type ToolFactory =
    Box<dyn Fn(TransitionContext, &ToolConfig) -> Result<Box<dyn ToolVariant>, ToolCreateError>>;

/// Built-in modes whose original handlers are outside this kernel's scope.
/// They exist as ids, but instantiating them substitutes the neutral
/// variant unless a custom factory is registered and the mode re-enabled.
const DEFAULT_DISABLED: &[ToolMode] = &[
    ToolMode::LinkAction,
    ToolMode::TextHighlighter,
    ToolMode::TextLinkCreate,
    ToolMode::RectLinkCreate,
    ToolMode::Signature,
    ToolMode::Stamper,
    ToolMode::RubberStamper,
    ToolMode::SoundCreate,
    ToolMode::FileAttachmentCreate,
    ToolMode::FormTextFieldCreate,
    ToolMode::FormCheckboxCreate,
    ToolMode::FormRadioGroupCreate,
    ToolMode::FormSignatureCreate,
    ToolMode::RichMedia,
    ToolMode::DigitalSignature,
];

pub struct ModeRegistry {
    factories: FxHashMap<ModeId, ToolFactory>,
    disabled: FxHashSet<ModeId>,
    disabled_save: Option<FxHashSet<ModeId>>,
    next_custom: u16,
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self {
            factories: FxHashMap::default(),
            disabled: DEFAULT_DISABLED
                .iter()
                .map(|&m| ModeId::Builtin(m))
                .collect(),
            disabled_save: None,
            next_custom: 0,
        }
    }
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh custom mode id.
    pub fn register_mode(&mut self) -> ModeId {
        let id = ModeId::Custom(self.next_custom);
        self.next_custom += 1;
        id
    }

    /// Installs (or overrides) the factory for a mode. Registering a factory
    /// for a custom mode also enables it.
    pub fn register_variant(&mut self, mode: ModeId, factory: ToolFactory) {
        self.factories.insert(mode, factory);
        if matches!(mode, ModeId::Custom(_)) {
            self.disabled.remove(&mode);
        }
    }

    /// Disabling an already-disabled mode is a no-op.
    pub fn disable_modes(&mut self, modes: &[ModeId]) {
        for &mode in modes {
            self.disabled.insert(mode);
        }
    }

    pub fn enable_modes(&mut self, modes: &[ModeId]) {
        for mode in modes {
            self.disabled.remove(mode);
        }
    }

    pub fn is_mode_disabled(&self, mode: ModeId) -> bool {
        self.disabled.contains(&mode)
    }

    /// Read-only documents disable everything but the neutral mode; the
    /// previous disabled set is remembered and restored on the way out.
    pub fn set_read_only(&mut self, read_only: bool) {
        if read_only {
            if self.disabled_save.is_none() {
                self.disabled_save = Some(self.disabled.clone());
            }
            self.disabled = self
                .all_known_modes()
                .into_iter()
                .filter(|m| !m.is_neutral())
                .collect();
        } else if let Some(saved) = self.disabled_save.take() {
            self.disabled = saved;
        }
    }

    fn all_known_modes(&self) -> Vec<ModeId> {
        let mut modes: Vec<ModeId> = ALL_BUILTIN.iter().map(|&m| ModeId::Builtin(m)).collect();
        modes.extend(self.factories.keys().copied());
        modes
    }

    /// Maps a requested mode to the one that will actually be instantiated:
    /// disabled modes resolve to neutral.
    pub fn resolve(&self, mode: ModeId) -> ModeId {
        if self.is_mode_disabled(mode) {
            ModeId::NEUTRAL
        } else {
            mode
        }
    }

    /// Instantiates the variant for an (already resolved) mode.
    pub fn create(
        &self,
        mode: ModeId,
        tc: TransitionContext,
        config: &ToolConfig,
    ) -> Result<Box<dyn ToolVariant>, ToolCreateError> {
        if let Some(factory) = self.factories.get(&mode) {
            return factory(tc, config);
        }
        match mode {
            ModeId::Builtin(builtin) => super::tools::builtin_tool(builtin, tc, config),
            ModeId::Custom(_) => Err(ToolCreateError::NoHandler(mode)),
        }
    }
}

pub(crate) const ALL_BUILTIN: [ToolMode; 42] = [
    ToolMode::Pan,
    ToolMode::AnnotEdit,
    ToolMode::AnnotEditLine,
    ToolMode::AnnotEditTextMarkup,
    ToolMode::AnnotEditRectGroup,
    ToolMode::AnnotEditAdvancedShape,
    ToolMode::TextSelect,
    ToolMode::FormFill,
    ToolMode::LinkAction,
    ToolMode::LineCreate,
    ToolMode::ArrowCreate,
    ToolMode::RulerCreate,
    ToolMode::RectCreate,
    ToolMode::OvalCreate,
    ToolMode::PolylineCreate,
    ToolMode::PolygonCreate,
    ToolMode::CloudCreate,
    ToolMode::InkCreate,
    ToolMode::InkEraser,
    ToolMode::StickyNoteCreate,
    ToolMode::FreeTextCreate,
    ToolMode::CalloutCreate,
    ToolMode::TextHighlightCreate,
    ToolMode::TextUnderlineCreate,
    ToolMode::TextSquigglyCreate,
    ToolMode::TextStrikeoutCreate,
    ToolMode::TextRedactionCreate,
    ToolMode::TextHighlighter,
    ToolMode::FreeHighlighter,
    ToolMode::TextLinkCreate,
    ToolMode::RectLinkCreate,
    ToolMode::Signature,
    ToolMode::Stamper,
    ToolMode::RubberStamper,
    ToolMode::SoundCreate,
    ToolMode::FileAttachmentCreate,
    ToolMode::FormTextFieldCreate,
    ToolMode::FormCheckboxCreate,
    ToolMode::FormRadioGroupCreate,
    ToolMode::FormSignatureCreate,
    ToolMode::RichMedia,
    ToolMode::DigitalSignature,
];
