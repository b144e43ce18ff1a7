//! 调度器：重放至收敛的事件分发
//!
//! 调度器独占持有活动变体。一次 dispatch 里，事件先交给当前变体，
//! 若它请求了新模式，就按固定的携带字段集构造新变体并把同一事件
//! 重放过去，直到模式收敛（或按事件类别在"已消费"处提前停住）。
//! 重放有步数上限：超限记诊断、就地收敛，绝不 panic。
//!
//! 模式对专属的一次性提示（便签/文本框创建 → 编辑态直开对话框、
//! 橡皮 → 中性吞下一次点按）由这里按 (from, to) 设置，变体自己
//! 不知道邻居是谁。

use compact_str::CompactString;
use tracing::{debug, error, warn};

use crate::core::event::{EventKind, EventResult, InputEvent};
use crate::core::geometry::{PageIndex, Rect};
use crate::doc::{DocLock, PdfDoc};
use crate::models::annot::AnnotId;
use crate::models::undo_entry::UndoEntry;
use crate::services::config::ToolConfig;
use crate::services::loader::{LoaderMessage, ResourceLoader};

use super::context::ToolCtx;
use super::effect::Effect;
use super::mode::{ModeId, ModeRegistry, ToolMode};
use super::notifier::{AnnotationListener, DocStructureListener, MutationNotifier};
use super::state::{AnnotViewHandle, TransitionContext};
use super::tool::{NullTool, ToolVariant};
use super::undo::{jump_effects, UndoRedoManager};
use super::viewport::Viewport;

/// Upper bound on mode transitions triggered by a single event. The
/// reference behavior is unbounded; exceeding this is a diagnostic
/// condition, not a crash.
pub const MAX_REPLAY_STEPS: usize = 8;

/// When the replay loop stops redelivering an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayPolicy {
    /// Redeliver until the requested mode equals the current mode.
    UntilSettled,
    /// Stop as soon as a handler consumes the event, even with a mode
    /// change still pending; the pending change takes effect on the next
    /// event. Long-press and the double-tap confirmation paths behave this
    /// way, and the asymmetry is kept deliberately.
    StopWhenHandled,
}

impl ReplayPolicy {
    pub fn for_event(kind: EventKind) -> Self {
        match kind {
            EventKind::LongPress
            | EventKind::DoubleTapBegin
            | EventKind::DoubleTapEvent
            | EventKind::DoubleTapEnd => ReplayPolicy::StopWhenHandled,
            _ => ReplayPolicy::UntilSettled,
        }
    }
}

#[derive(Debug)]
pub struct DispatchResult {
    pub handled: bool,
    pub effects: Vec<Effect>,
}

pub struct Dispatcher {
    doc: DocLock,
    viewport: Viewport,
    config: ToolConfig,
    registry: ModeRegistry,
    notifier: MutationNotifier,
    undo: UndoRedoManager,
    active: Box<dyn ToolVariant>,
    effects: Vec<Effect>,
    /// One-shot: swallow the next press/move/release triple (set after a
    /// dialog closes so the dismissing tap does not edit the document).
    skip_next_touch: bool,
    last_selection: Option<(AnnotId, PageIndex)>,
    loader: Option<ResourceLoader>,
    fonts: Option<Vec<CompactString>>,
    closed: bool,
}

impl Dispatcher {
    pub fn new(doc: PdfDoc, config: ToolConfig) -> Self {
        let registry = ModeRegistry::new();
        let tc = TransitionContext::initial();
        let active = registry
            .create(ModeId::NEUTRAL, tc.clone(), &config)
            .unwrap_or_else(|e| {
                error!(error = %e, "neutral variant construction failed at startup");
                Box::new(NullTool::new(ModeId::NEUTRAL, &tc))
            });
        let loader = match ResourceLoader::start() {
            Ok(loader) => Some(loader),
            Err(e) => {
                warn!(error = %e, "system resource loader unavailable");
                None
            }
        };
        Self {
            doc: DocLock::new(doc),
            viewport: Viewport::new(),
            config,
            registry,
            notifier: MutationNotifier::new(),
            undo: UndoRedoManager::new(),
            active,
            effects: Vec::new(),
            skip_next_touch: false,
            last_selection: None,
            loader,
            fonts: None,
            closed: false,
        }
    }

    // ==================== 访问器 ====================

    pub fn doc(&self) -> &DocLock {
        &self.doc
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ToolConfig {
        &mut self.config
    }

    pub fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModeRegistry {
        &mut self.registry
    }

    pub fn mode(&self) -> ModeId {
        self.active.mode()
    }

    pub fn selection(&self) -> Option<(AnnotId, PageIndex)> {
        let common = self.active.common();
        common.annot.map(|id| (id, common.annot_page))
    }

    pub fn is_creating_annotation(&self) -> bool {
        self.active.is_creating_annotation()
    }

    /// Font families loaded by the background resource task, once ready.
    pub fn loaded_fonts(&self) -> Option<&[CompactString]> {
        self.fonts.as_deref()
    }

    pub fn add_annotation_listener(&mut self, listener: Box<dyn AnnotationListener>) {
        self.notifier.add_annotation_listener(listener);
    }

    pub fn add_doc_listener(&mut self, listener: Box<dyn DocStructureListener>) {
        self.notifier.add_doc_listener(listener);
    }

    /// Drains effects accumulated by calls outside `dispatch` (selection
    /// API, undo/redo, page operations).
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    // ==================== 事件入口 ====================

    pub fn dispatch(&mut self, event: &InputEvent) -> DispatchResult {
        if self.closed {
            warn!("dispatch after close ignored");
            return DispatchResult {
                handled: false,
                effects: Vec::new(),
            };
        }
        self.poll_background();

        if self.skip_next_touch && event.is_touch() {
            if event.kind() == EventKind::Up {
                self.skip_next_touch = false;
            }
            return DispatchResult {
                handled: true,
                effects: std::mem::take(&mut self.effects),
            };
        }

        let handled = self.settle(event);
        if let Some((id, page)) = self.selection() {
            self.last_selection = Some((id, page));
        }
        DispatchResult {
            handled,
            effects: std::mem::take(&mut self.effects),
        }
    }

    /// The replay-until-settled loop for one event. The event counts as
    /// handled when any variant along the replay chain consumed it.
    fn settle(&mut self, event: &InputEvent) -> bool {
        let policy = ReplayPolicy::for_event(event.kind());
        let mut handled = false;
        let mut steps = 0;
        loop {
            let prev = self.active.mode();
            let consumed = self.deliver(event).is_consumed();
            handled = handled || consumed;
            if policy == ReplayPolicy::StopWhenHandled && consumed {
                // 挂起的模式请求留到下一个事件生效
                break;
            }
            let next = self.registry.resolve(self.active.requested_next_mode());
            if next == prev {
                // 固定点：请求被禁用集合折回当前模式时也在这里收敛
                self.active.common_mut().next_mode = prev;
                if prev.is_neutral() {
                    // 中性模式不保留选择，即使切换被禁用集合拒绝
                    self.active.common_mut().clear_selection();
                }
                break;
            }
            steps += 1;
            if steps > MAX_REPLAY_STEPS {
                error!(
                    from = %prev,
                    to = %next,
                    steps,
                    "replay cap exceeded; settling in current variant"
                );
                self.active.common_mut().next_mode = prev;
                break;
            }
            self.transition(next);
            // 回到循环头，同一事件重放给新变体
        }
        handled
    }

    fn deliver(&mut self, event: &InputEvent) -> EventResult {
        let Self {
            doc,
            viewport,
            config,
            registry,
            notifier,
            undo,
            effects,
            active,
            ..
        } = self;
        let mut ctx = ToolCtx {
            doc,
            viewport,
            config,
            registry,
            notifier,
            undo,
            effects,
        };
        match event {
            InputEvent::Down { at } => active.on_down(&mut ctx, *at),
            InputEvent::Move { from, to } => active.on_move(&mut ctx, *from, *to),
            InputEvent::Up { at, prior } => active.on_up(&mut ctx, *at, *prior),
            InputEvent::LongPress { at } => active.on_long_press(&mut ctx, *at),
            InputEvent::ScaleBegin { focus } => active.on_scale_begin(&mut ctx, *focus),
            InputEvent::Scale { focus, factor } => active.on_scale(&mut ctx, *focus, *factor),
            InputEvent::ScaleEnd { focus } => active.on_scale_end(&mut ctx, *focus),
            InputEvent::FlingStop => active.on_fling_stop(&mut ctx),
            InputEvent::DoubleTapBegin { at } => active.on_double_tap_begin(&mut ctx, *at),
            InputEvent::DoubleTapEvent { at } => active.on_double_tap_event(&mut ctx, *at),
            InputEvent::DoubleTapEnd { at } => active.on_double_tap_end(&mut ctx, *at),
            InputEvent::KeyUp(key) => active.on_key_up(&mut ctx, *key),
            InputEvent::ScrollChanged { left, top } => {
                active.on_scroll_changed(&mut ctx, *left, *top)
            }
            InputEvent::LayoutChanged { changed } => active.on_layout(&mut ctx, *changed),
            InputEvent::Custom(tag) => active.on_custom_event(&mut ctx, tag),
        }
    }

    // ==================== 模式切换 ====================

    /// Explicit tool switch (toolbar path). Disabled modes resolve to
    /// neutral; switching to the current mode is a no-op.
    pub fn set_tool(&mut self, mode: ModeId) {
        let resolved = self.registry.resolve(mode);
        if resolved != mode {
            debug!(requested = %mode, "disabled mode requested; substituting neutral");
        }
        if resolved != self.active.mode() {
            self.transition(resolved);
        }
    }

    /// Tears down the active variant and cancels background work. The
    /// dispatcher accepts no further events afterwards.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.with_ctx(|active, ctx| active.on_close(ctx));
        if let Some(mut loader) = self.loader.take() {
            loader.cancel();
        }
    }

    fn with_ctx(&mut self, f: impl FnOnce(&mut dyn ToolVariant, &mut ToolCtx)) {
        let Self {
            doc,
            viewport,
            config,
            registry,
            notifier,
            undo,
            effects,
            active,
            ..
        } = self;
        let mut ctx = ToolCtx {
            doc,
            viewport,
            config,
            registry,
            notifier,
            undo,
            effects,
        };
        f(active.as_mut(), &mut ctx);
    }

    /// `to` must already be resolved against the disabled set.
    fn transition(&mut self, to: ModeId) {
        self.transition_with(to, |_| {});
    }

    fn transition_with(&mut self, to: ModeId, prime: impl FnOnce(&mut TransitionContext)) {
        let from = self.active.mode();
        let mut tc = TransitionContext::capture(self.active.common(), to);
        apply_mode_pair_hints(&mut tc, from, to);
        prime(&mut tc);

        // 旧变体恰好关闭一次，之后不再收到任何事件
        self.with_ctx(|active, ctx| active.on_close(ctx));

        let mut next = self.instantiate(to, tc);
        if next.mode().is_neutral() {
            // 中性模式下选择必须为空；对自定义中性变体也强制执行
            next.common_mut().clear_selection();
        }
        self.active = next;
        let to = self.active.mode();
        debug!(%from, %to, "tool changed");
        self.effects.push(Effect::ToolChanged { from, to });
        self.with_ctx(|active, ctx| active.on_create(ctx));
    }

    /// Variant construction with the recovery ladder: failed factory →
    /// neutral variant → null variant. Never propagates.
    fn instantiate(&mut self, mode: ModeId, tc: TransitionContext) -> Box<dyn ToolVariant> {
        match self.registry.create(mode, tc.clone(), &self.config) {
            Ok(tool) => tool,
            Err(e) => {
                error!(error = %e, "variant construction failed; substituting neutral");
                let mut tc = tc;
                tc.clear_selection();
                self.registry
                    .create(ModeId::NEUTRAL, tc.clone(), &self.config)
                    .unwrap_or_else(|e| {
                        error!(error = %e, "neutral variant construction failed");
                        Box::new(NullTool::new(ModeId::NEUTRAL, &tc))
                    })
            }
        }
    }

    // ==================== 选择 API ====================

    /// Programmatic selection: validates the handle, then enters the
    /// editor variant for the annotation's kind with the selection carried
    /// over. Returns false when the handle is dead or its editor mode is
    /// disabled.
    pub fn select_annotation(&mut self, id: AnnotId, page: PageIndex) -> bool {
        let info = {
            let doc = self.doc.read();
            doc.annot(id).map(|a| (a.kind, a.rect, a.locked))
        };
        let Some((kind, rect, locked)) = info else {
            warn!("select_annotation with dead handle");
            return false;
        };
        let mode = ModeId::Builtin(self.config.handler_mode(kind));
        let resolved = self.registry.resolve(mode);
        if resolved.is_neutral() {
            debug!(%mode, "editor mode disabled; selection refused");
            return false;
        }
        self.transition_with(resolved, |tc| {
            tc.annot = Some(id);
            tc.annot_page = page;
            tc.annot_bbox = rect;
            tc.annot_can_edit = !locked;
        });
        self.last_selection = Some((id, page));
        true
    }

    /// Drops any selection and returns to the neutral mode.
    pub fn deselect_all(&mut self) {
        if !self.active.mode().is_neutral() || self.selection().is_some() {
            self.transition(ModeId::NEUTRAL);
        }
    }

    /// Re-selects the most recently selected annotation, if it still
    /// exists in the document.
    pub fn reselect_last_annotation(&mut self) -> bool {
        let Some((id, page)) = self.last_selection else {
            return false;
        };
        self.select_annotation(id, page)
    }

    /// Arms the one-shot latch that swallows the next touch sequence.
    pub fn set_skip_next_touch(&mut self) {
        self.skip_next_touch = true;
    }

    /// Arms the one-shot latch that drops the next long-press (set after a
    /// long-press already produced a dialog, so releasing late does not
    /// re-trigger it).
    pub fn set_avoid_next_long_press(&mut self) {
        self.active.common_mut().avoid_long_press = true;
    }

    /// Attaches (or detaches) the platform view overlay for the current
    /// selection. Carried across mode transitions, dropped with the
    /// selection, never dereferenced by the kernel.
    pub fn set_annot_view(&mut self, view: Option<AnnotViewHandle>) {
        self.active.common_mut().annot_view = view;
    }

    pub fn annot_view(&self) -> Option<AnnotViewHandle> {
        self.active.common().annot_view
    }

    /// The platform layer reports pointer type out of band; stylus presses
    /// let the neutral mode drop straight into ink drawing when
    /// `stylus_as_pen` is configured.
    pub fn set_stylus_used(&mut self, used: bool) {
        self.active.common_mut().stylus_used = used;
    }

    // ==================== 撤销 / 重做 ====================

    pub fn undo(&mut self) -> Option<UndoEntry> {
        let entry = {
            let mut doc = self.doc.write();
            self.undo.undo(&mut doc)
        }?;
        self.after_history_jump(&entry, true);
        Some(entry)
    }

    pub fn redo(&mut self) -> Option<UndoEntry> {
        let entry = {
            let mut doc = self.doc.write();
            self.undo.redo(&mut doc)
        }?;
        self.after_history_jump(&entry, false);
        Some(entry)
    }

    /// View restoration and selection repair after an undo/redo.
    fn after_history_jump(&mut self, entry: &UndoEntry, is_undo: bool) {
        let fx = jump_effects(entry, is_undo, self.viewport.current_page());
        for effect in &fx {
            if let Effect::ScrollToPage(page) = effect {
                let doc = self.doc.read();
                self.viewport.set_current_page(&doc, *page);
            }
        }
        self.effects.extend(fx);

        // 历史跳转可能抹掉当前选中的批注
        if let Some(id) = self.active.common().annot {
            let rect = {
                let doc = self.doc.read();
                doc.annot_rect(id)
            };
            match rect {
                Some(rect) => self.active.common_mut().annot_bbox = rect,
                None => self.transition(ModeId::NEUTRAL),
            }
        }
        self.effects.push(Effect::Invalidate);
    }

    pub fn peek_next_undo_label(&self) -> CompactString {
        let doc = self.doc.read();
        self.undo.peek_next_undo_label(&doc)
    }

    pub fn peek_next_redo_label(&self) -> CompactString {
        let doc = self.doc.read();
        self.undo.peek_next_redo_label(&doc)
    }

    pub fn can_undo(&self) -> bool {
        let doc = self.doc.read();
        self.undo.can_undo(&doc)
    }

    pub fn can_redo(&self) -> bool {
        let doc = self.doc.read();
        self.undo.can_redo(&doc)
    }

    /// Safety snapshot before persisting; a no-op when nothing changed
    /// since the last snapshot.
    pub fn prepare_save(&mut self) {
        let mut doc = self.doc.write();
        self.undo.take_snapshot_for_safety(&mut doc);
    }

    // ==================== 页面结构操作 ====================
    //
    // 嵌入方通过这些入口做页面编辑：引擎调用在独占锁内完成，
    // 通知与快照的顺序与批注路径一致。

    pub fn add_pages(&mut self, at: PageIndex, count: u32) -> Vec<PageIndex> {
        let mut doc = self.doc.write();
        let pages = doc.add_pages(at, count);
        self.notifier.pages_added(&pages);
        self.undo.on_pages_added(&mut doc, &pages);
        drop(doc);
        self.effects.push(Effect::RebuildPageLayout);
        pages
    }

    pub fn delete_pages(&mut self, pages: &[PageIndex]) -> bool {
        let mut doc = self.doc.write();
        if let Err(e) = doc.delete_pages(pages) {
            error!(error = %e, "delete_pages failed");
            return false;
        }
        self.notifier.pages_deleted(pages);
        self.undo.on_pages_deleted(&mut doc, pages);
        drop(doc);
        self.effects.push(Effect::RebuildPageLayout);
        self.revalidate_selection_page();
        true
    }

    /// Deleting or reordering pages shifts page numbers under a live
    /// selection; re-derive them from the engine or drop the selection.
    fn revalidate_selection_page(&mut self) {
        let Some(id) = self.active.common().annot else {
            return;
        };
        let page = {
            let doc = self.doc.read();
            doc.annot_page(id)
        };
        match page {
            Some(page) => self.active.common_mut().annot_page = page,
            None => self.transition(ModeId::NEUTRAL),
        }
    }

    pub fn rotate_pages(&mut self, pages: &[PageIndex]) -> bool {
        let mut doc = self.doc.write();
        if let Err(e) = doc.rotate_pages(pages) {
            error!(error = %e, "rotate_pages failed");
            return false;
        }
        self.notifier.pages_rotated(pages);
        self.undo.on_pages_rotated(&mut doc, pages);
        drop(doc);
        self.effects.push(Effect::RebuildPageLayout);
        true
    }

    pub fn move_page(&mut self, from: PageIndex, to: PageIndex) -> bool {
        let mut doc = self.doc.write();
        if let Err(e) = doc.move_page(from, to) {
            error!(error = %e, "move_page failed");
            return false;
        }
        self.notifier.page_moved(from, to);
        self.undo.on_page_moved(&mut doc, from, to);
        drop(doc);
        self.effects.push(Effect::RebuildPageLayout);
        self.revalidate_selection_page();
        true
    }

    pub fn crop_page(&mut self, page: PageIndex, crop: Rect) -> bool {
        let mut doc = self.doc.write();
        if let Err(e) = doc.crop_page(page, crop) {
            error!(error = %e, "crop_page failed");
            return false;
        }
        self.notifier.pages_cropped();
        self.undo.on_pages_cropped(&mut doc);
        drop(doc);
        self.effects.push(Effect::RebuildPageLayout);
        true
    }

    pub fn add_bookmark(&mut self, label: &str, page: PageIndex) {
        let mut doc = self.doc.write();
        doc.add_bookmark(label, page);
        self.notifier.bookmark_modified();
        self.undo.on_bookmark_modified(&mut doc);
    }

    pub fn remove_annotations_on_page(&mut self, page: PageIndex) -> bool {
        let mut doc = self.doc.write();
        match doc.remove_annots_on_page(page) {
            Ok(_) => {
                self.notifier.annotations_removed_on_page(page);
                self.undo.on_annotations_removed_on_page(&mut doc, page);
                drop(doc);
                self.effects.push(Effect::Invalidate);
                if self.active.common().annot_page == page {
                    self.transition(ModeId::NEUTRAL);
                }
                true
            }
            Err(e) => {
                error!(error = %e, "remove_annotations_on_page failed");
                false
            }
        }
    }

    pub fn remove_all_annotations(&mut self) {
        let mut doc = self.doc.write();
        doc.remove_all_annots();
        self.notifier.all_annotations_removed();
        self.undo.on_all_annotations_removed(&mut doc);
        drop(doc);
        self.effects.push(Effect::Invalidate);
        if self.selection().is_some() {
            self.transition(ModeId::NEUTRAL);
        }
    }

    // ==================== 后台资源 ====================

    /// Drains completions from the background loader; runs on the dispatch
    /// thread, so touching dispatcher state here is safe.
    fn poll_background(&mut self) {
        let Some(loader) = &self.loader else { return };
        while let Some(msg) = loader.try_recv() {
            match msg {
                LoaderMessage::FontsLoaded(families) => {
                    debug!(count = families.len(), "system font tables loaded");
                    self.fonts = Some(families);
                }
                LoaderMessage::Failed(err) => {
                    warn!(error = %err, "system resource load failed");
                }
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Mode-pair carry-over rules: one-shot hints the incoming variant
/// consumes on construction.
fn apply_mode_pair_hints(tc: &mut TransitionContext, from: ModeId, to: ModeId) {
    let (ModeId::Builtin(from_mode), ModeId::Builtin(to_mode)) = (from, to) else {
        return;
    };
    match from_mode {
        // 创建即编辑：跳过中间菜单，直接进属性/笔记对话框
        ToolMode::StickyNoteCreate if to_mode.is_annot_edit() && tc.creation_event_raised => {
            tc.up_from_sticky_create = true;
        }
        ToolMode::FreeTextCreate | ToolMode::CalloutCreate
            if to_mode.is_annot_edit() && tc.creation_event_raised =>
        {
            tc.up_from_free_text_create = true;
        }
        // 刚擦完的抬手不该立刻变成下一次选中
        ToolMode::InkEraser if to.is_neutral() => {
            tc.suppress_next_tap = true;
        }
        _ => {}
    }
}
