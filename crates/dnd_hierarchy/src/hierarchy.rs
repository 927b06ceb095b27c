use std::{ops::Range, rc::Rc};

use gpui::{
    App, AppContext as _, Context, DragMoveEvent, ElementId, Entity, EntityId, EventEmitter,
    FocusHandle, Hsla, InteractiveElement as _, IntoElement, ListSizingBehavior,
    ParentElement as _, Pixels, Point, Render, RenderOnce, SharedString,
    StatefulInteractiveElement as _, StyleRefinement, Styled, UniformListScrollHandle, Window,
    div, prelude::FluentBuilder as _, px, uniform_list,
};
use gpui_component::list::ListItem;
use gpui_component::scroll::{Scrollbar, ScrollbarState};
use gpui_component::{ActiveTheme as _, StyledExt as _};
use gpui_hierarchy_core::{
    DndConfig, DropOutcome, DropTarget, Hierarchy, HierarchyDnd, IndicatorSpec, InsertionMode,
    MoveRecord, NodeKind, SessionMisuse,
};

use crate::common::{DragGhost, bounds_to_rect};

const CONTEXT: &str = "DndHierarchy";

/// Create a [`DndHierarchy`].
pub fn dnd_hierarchy<R>(state: &Entity<DndHierarchyState>, render_item: R) -> DndHierarchy
where
    R: Fn(usize, &DndHierarchyEntry, DndHierarchyRowState, &mut Window, &mut App) -> ListItem
        + 'static,
{
    DndHierarchy::new(state, render_item)
}

#[derive(Clone)]
struct DndHierarchyDrag {
    tree_id: EntityId,
    node_id: SharedString,
    label: SharedString,
}

/// One visible row: a node of the hierarchy with its depth.
#[derive(Clone, Debug)]
pub struct DndHierarchyEntry {
    id: SharedString,
    label: SharedString,
    kind: NodeKind,
    depth: usize,
    budget: f64,
    expanded: bool,
    has_children: bool,
}

impl DndHierarchyEntry {
    #[inline]
    pub fn id(&self) -> &SharedString {
        &self.id
    }

    #[inline]
    pub fn label(&self) -> &SharedString {
        &self.label
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Rolled-up total: own budget plus everything below.
    #[inline]
    pub fn budget(&self) -> f64 {
        self.budget
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.has_children
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DndHierarchyRowState {
    pub selected: bool,
    pub dragging: bool,
    pub drop_target: Option<InsertionMode>,
}

#[derive(Clone, Debug)]
pub enum DndHierarchyEvent {
    /// A drop was committed. The tree has already been updated.
    Moved(MoveRecord),
}

#[derive(Clone, Copy, Debug)]
pub enum DndHierarchyIndicatorCap {
    None,
    StartBar { width: Pixels, height: Pixels },
    StartAndEndBars { width: Pixels, height: Pixels },
}

#[derive(Clone, Copy, Debug)]
pub struct DndHierarchyIndicatorStyle {
    pub color: Option<Hsla>,
    pub cap: DndHierarchyIndicatorCap,
}

impl Default for DndHierarchyIndicatorStyle {
    fn default() -> Self {
        Self {
            color: None,
            cap: DndHierarchyIndicatorCap::StartBar {
                width: px(2.),
                height: px(10.),
            },
        }
    }
}

/// State for a draggable campaign hierarchy.
pub struct DndHierarchyState {
    focus_handle: FocusHandle,
    engine: HierarchyDnd,
    config: DndConfig,
    entries: Vec<DndHierarchyEntry>,
    indent_width: Pixels,
    indent_offset: Pixels,
    indicator_style: DndHierarchyIndicatorStyle,
    expand_on_inside_drop: bool,
    scrollbar_state: ScrollbarState,
    scroll_handle: UniformListScrollHandle,
    selected_id: Option<SharedString>,
    list_origin: Point<Pixels>,
    pointer_inside: bool,
    render_item: Rc<
        dyn Fn(usize, &DndHierarchyEntry, DndHierarchyRowState, &mut Window, &mut App) -> ListItem,
    >,
}

impl EventEmitter<DndHierarchyEvent> for DndHierarchyState {}

impl DndHierarchyState {
    pub fn new(cx: &mut App) -> Self {
        let config = DndConfig::default();
        Self {
            focus_handle: cx.focus_handle(),
            engine: HierarchyDnd::with_config(Hierarchy::new(), config),
            config,
            entries: Vec::new(),
            indent_width: px(16.),
            indent_offset: px(10.),
            indicator_style: DndHierarchyIndicatorStyle::default(),
            expand_on_inside_drop: true,
            scrollbar_state: ScrollbarState::default(),
            scroll_handle: UniformListScrollHandle::default(),
            selected_id: None,
            list_origin: Point::default(),
            pointer_inside: false,
            render_item: Rc::new(|_, _, _, _, _| ListItem::new("dnd-hierarchy-empty")),
        }
    }

    pub fn hierarchy(mut self, tree: Hierarchy) -> Self {
        self.engine.set_hierarchy(tree);
        self.rebuild_entries();
        self
    }

    /// Hit-test zones and indicator thickness. Invalid configs are ignored.
    pub fn config(mut self, config: DndConfig) -> Self {
        match config.validated() {
            Ok(config) => {
                let tree = std::mem::take(self.engine.hierarchy_mut());
                self.engine = HierarchyDnd::with_config(tree, config);
                self.config = config;
            }
            Err(err) => tracing::warn!(%err, "keeping previous drag-and-drop config"),
        }
        self
    }

    /// Set the indentation width used to place the indicator line.
    ///
    /// This should match the indentation used by your row renderer.
    pub fn indent_width(mut self, indent_width: Pixels) -> Self {
        self.indent_width = indent_width;
        self
    }

    /// Set the left offset for the drop indicator line.
    pub fn indent_offset(mut self, indent_offset: Pixels) -> Self {
        self.indent_offset = indent_offset;
        self
    }

    pub fn indicator_style(mut self, style: DndHierarchyIndicatorStyle) -> Self {
        self.indicator_style = style;
        self
    }

    pub fn indicator_color(mut self, color: Hsla) -> Self {
        self.indicator_style.color = Some(color);
        self
    }

    pub fn indicator_thickness(self, thickness: Pixels) -> Self {
        let config = self
            .config
            .indicator_thickness(f32::from(thickness) as f64);
        self.config(config)
    }

    pub fn indicator_cap(mut self, cap: DndHierarchyIndicatorCap) -> Self {
        self.indicator_style.cap = cap;
        self
    }

    /// Expand the destination after a drop `inside` it. Defaults to `true`.
    pub fn expand_on_inside_drop(mut self, expand: bool) -> Self {
        self.expand_on_inside_drop = expand;
        self
    }

    /// Replace the whole tree, e.g. after an external edit. Cancels a drag in flight.
    pub fn set_hierarchy(&mut self, tree: Hierarchy, cx: &mut Context<Self>) {
        if self.engine.is_dragging()
            && let Err(err) = self.engine.cancel()
        {
            report_misuse(err);
        }
        self.engine.set_hierarchy(tree);
        if self
            .selected_id
            .as_ref()
            .is_some_and(|id| !self.engine.hierarchy().contains(id))
        {
            self.selected_id = None;
        }
        self.rebuild_entries();
        cx.notify();
    }

    pub fn tree(&self) -> &Hierarchy {
        self.engine.hierarchy()
    }

    pub fn entries(&self) -> &[DndHierarchyEntry] {
        &self.entries
    }

    pub fn selected_entry(&self) -> Option<&DndHierarchyEntry> {
        let selected_id = self.selected_id.as_ref()?;
        self.entries.iter().find(|entry| entry.id == *selected_id)
    }

    pub fn set_selected(&mut self, id: Option<SharedString>, cx: &mut Context<Self>) {
        self.selected_id = id;
        cx.notify();
    }

    pub fn is_dragging(&self) -> bool {
        self.engine.is_dragging()
    }

    /// Abort the current drag, leaving the tree untouched.
    pub fn cancel_drag(&mut self, cx: &mut Context<Self>) {
        if !self.engine.is_dragging() {
            return;
        }
        if let Err(err) = self.engine.cancel() {
            report_misuse(err);
        }
        cx.notify();
    }

    fn rebuild_entries(&mut self) {
        let tree = self.engine.hierarchy();
        self.entries = tree
            .visible_rows()
            .into_iter()
            .filter_map(|row| {
                let node = tree.get(&row.id)?;
                Some(DndHierarchyEntry {
                    id: row.id.into(),
                    label: node.title().to_string().into(),
                    kind: row.kind,
                    depth: row.depth,
                    budget: node.rollup_budget(),
                    expanded: node.is_expanded(),
                    has_children: node.has_children(),
                })
            })
            .collect();
        self.engine.clear_targets();
    }

    /// Drop targets scrolled out of view must not catch the pointer.
    fn retain_visible_targets(&mut self, visible_range: &Range<usize>) {
        for (ix, entry) in self.entries.iter().enumerate() {
            if !visible_range.contains(&ix) {
                self.engine.unregister_target(&entry.id);
            }
        }
    }

    fn on_entry_click(&mut self, ix: usize, cx: &mut Context<Self>) {
        let Some(entry) = self.entries.get(ix) else {
            return;
        };
        let id = entry.id.clone();
        if self.engine.hierarchy_mut().toggle_expanded(&id) {
            self.rebuild_entries();
        }
        self.selected_id = Some(id);
        cx.notify();
    }

    fn on_drag_start(&mut self, drag: &DndHierarchyDrag, cx: &mut Context<Self>) {
        if self.engine.is_dragging() {
            tracing::debug!("previous drag never released, cancelling it");
            if let Err(err) = self.engine.cancel() {
                report_misuse(err);
            }
        }
        match self.engine.start_drag(&drag.node_id) {
            Ok(()) => {
                self.selected_id = Some(drag.node_id.clone());
                self.pointer_inside = true;
            }
            Err(err) => report_misuse(err),
        }
        cx.notify();
    }

    fn accepts(&self, event: &DragMoveEvent<DndHierarchyDrag>, cx: &Context<Self>) -> bool {
        cx.has_active_drag()
            && self.engine.is_dragging()
            && event.drag(cx).tree_id == cx.entity_id()
    }

    fn on_row_drag_move(
        &mut self,
        ix: usize,
        event: &DragMoveEvent<DndHierarchyDrag>,
        _window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if !self.accepts(event, cx) {
            return;
        }
        let Some(entry) = self.entries.get(ix) else {
            return;
        };

        // Only register here; the list-level listener resolves once per move.
        let target = DropTarget::new(entry.kind, bounds_to_rect(event.bounds));
        self.engine.register_target(entry.id.to_string(), target);
    }

    fn on_list_drag_move(
        &mut self,
        event: &DragMoveEvent<DndHierarchyDrag>,
        _window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if !self.accepts(event, cx) {
            return;
        }

        self.list_origin = event.bounds.origin;
        let position = event.event.position;
        let inside = event.bounds.contains(&position);
        if inside != self.pointer_inside {
            self.pointer_inside = inside;
            cx.notify();
        }
        if inside {
            self.update_pointer(position, cx);
        }
    }

    fn update_pointer(&mut self, position: Point<Pixels>, cx: &mut Context<Self>) {
        let previous = self.engine.indicator().cloned();
        let x = f32::from(position.x) as f64;
        let y = f32::from(position.y) as f64;
        match self.engine.pointer_move(x, y) {
            Ok(indicator) => {
                if indicator != previous.as_ref() {
                    cx.notify();
                }
            }
            Err(err) => report_misuse(err),
        }
    }

    fn on_drop(&mut self, drag: &DndHierarchyDrag, _window: &mut Window, cx: &mut Context<Self>) {
        if drag.tree_id != cx.entity_id() || !self.engine.is_dragging() {
            return;
        }

        let inside_target = self
            .engine
            .session()
            .candidate()
            .filter(|candidate| candidate.mode == InsertionMode::Inside)
            .map(|candidate| candidate.target_id.clone());

        match self.engine.release() {
            Ok(DropOutcome::Moved(record)) => {
                if self.expand_on_inside_drop
                    && let Some(target_id) = inside_target
                {
                    self.engine.hierarchy_mut().set_expanded(&target_id, true);
                }
                self.rebuild_entries();
                self.selected_id = Some(record.node_id.clone().into());
                cx.emit(DndHierarchyEvent::Moved(record));
            }
            Ok(DropOutcome::Unchanged | DropOutcome::Cancelled) => {}
            Err(err) => report_misuse(err),
        }
        self.pointer_inside = false;
        cx.notify();
    }

    fn line_depth(&self, spec: &IndicatorSpec) -> usize {
        let depth = self
            .entries
            .iter()
            .find(|entry| spec.target_id == entry.id.as_str())
            .map_or(0, DndHierarchyEntry::depth);
        match spec.direction {
            InsertionMode::Inside => depth + 1,
            InsertionMode::Before | InsertionMode::After => depth,
        }
    }
}

/// Gesture-layer contract violations: loud in debug builds, logged in release.
fn report_misuse(err: SessionMisuse) {
    tracing::error!(%err, "drag-and-drop gesture wiring is broken");
    debug_assert!(false, "{err}");
}

/// Top and height of the indicator band relative to the list origin.
fn indicator_band(spec: &IndicatorSpec, list_origin: Point<Pixels>) -> (Pixels, Pixels) {
    let top = px(spec.rect.y0 as f32) - list_origin.y;
    let height = px(spec.rect.height() as f32).max(px(1.));
    (top, height)
}

impl Render for DndHierarchyState {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        // The drag ended somewhere that never reached `on_drop`.
        if !cx.has_active_drag() && self.engine.is_dragging() {
            if let Err(err) = self.engine.cancel() {
                report_misuse(err);
            }
            self.pointer_inside = false;
        }

        let render_item = Rc::clone(&self.render_item);
        let state_entity = cx.entity();
        let dragged_id: Option<SharedString> =
            self.engine.session().dragged_id().map(|id| id.to_string().into());
        let indicator = self
            .engine
            .indicator()
            .filter(|_| self.pointer_inside)
            .cloned();
        let indicator_style = self.indicator_style;

        let line = indicator.as_ref().map(|spec| {
            let theme = cx.theme();
            let color = indicator_style.color.unwrap_or(theme.drag_border);
            let (top, thickness) = indicator_band(spec, self.list_origin);
            let left = self.indent_offset + self.indent_width * self.line_depth(spec);

            let mut line = div()
                .absolute()
                .left(left)
                .right_0()
                .top(top)
                .h(thickness)
                .bg(color);

            let (cap_width, cap_height, both_ends) = match indicator_style.cap {
                DndHierarchyIndicatorCap::None => return line,
                DndHierarchyIndicatorCap::StartBar { width, height } => (width, height, false),
                DndHierarchyIndicatorCap::StartAndEndBars { width, height } => {
                    (width, height, true)
                }
            };
            let cap_width = cap_width.max(px(1.));
            let cap_height = cap_height.max(px(1.));
            let offset_y = (thickness - cap_height) / 2.0;
            line = line.child(
                div()
                    .absolute()
                    .left(px(0.) - cap_width / 2.0)
                    .top(offset_y)
                    .w(cap_width)
                    .h(cap_height)
                    .bg(color),
            );
            if both_ends {
                line = line.child(
                    div()
                        .absolute()
                        .right_0()
                        .top(offset_y)
                        .w(cap_width)
                        .h(cap_height)
                        .bg(color),
                );
            }
            line
        });

        div()
            .id("dnd-hierarchy-state")
            .size_full()
            .relative()
            .child(
                uniform_list("entries", self.entries.len(), {
                    cx.processor(move |state, visible_range: Range<usize>, window, cx| {
                        state.retain_visible_targets(&visible_range);

                        let drop_target_bg = cx.theme().drop_target;
                        let mut items = Vec::with_capacity(visible_range.len());
                        for ix in visible_range {
                            let entry = &state.entries[ix];
                            let selected = state.selected_id.as_ref() == Some(&entry.id);
                            let dragging =
                                dragged_id.as_ref().is_some_and(|id| *id == entry.id)
                                    && cx.has_active_drag();
                            let drop_target = indicator
                                .as_ref()
                                .filter(|spec| spec.target_id == entry.id.as_str())
                                .map(|spec| spec.direction);

                            let row_state = DndHierarchyRowState {
                                selected,
                                dragging,
                                drop_target,
                            };

                            let item = (render_item)(ix, entry, row_state, window, cx);
                            let drag_value = DndHierarchyDrag {
                                tree_id: cx.entity_id(),
                                node_id: entry.id.clone(),
                                label: entry.label.clone(),
                            };

                            let state_entity = state_entity.clone();
                            let row = div()
                                .id(ix)
                                .when(drop_target == Some(InsertionMode::Inside), |this| {
                                    this.bg(drop_target_bg)
                                })
                                .child(item.selected(selected))
                                .on_drag_move::<DndHierarchyDrag>(cx.listener(
                                    move |this, ev, window, cx| {
                                        this.on_row_drag_move(ix, ev, window, cx);
                                    },
                                ))
                                .on_click(cx.listener(move |this, _, _, cx| {
                                    this.on_entry_click(ix, cx);
                                }))
                                .on_drag(drag_value, move |drag, _, _, cx| {
                                    state_entity.update(cx, |state, cx| {
                                        state.on_drag_start(drag, cx);
                                    });
                                    let label = drag.label.clone();
                                    cx.new(|_| DragGhost::new(label))
                                });

                            items.push(row);
                        }
                        items
                    })
                })
                .on_drag_move::<DndHierarchyDrag>(cx.listener(Self::on_list_drag_move))
                .on_drop::<DndHierarchyDrag>(cx.listener(Self::on_drop))
                .flex_grow()
                .size_full()
                .track_scroll(self.scroll_handle.clone())
                .with_sizing_behavior(ListSizingBehavior::Auto)
                .into_any_element(),
            )
            .child(
                div()
                    .absolute()
                    .top_0()
                    .right_0()
                    .bottom_0()
                    .w(px(12.))
                    .child(Scrollbar::uniform_scroll(
                        &self.scrollbar_state,
                        &self.scroll_handle,
                    )),
            )
            .when_some(line, |this, line| this.child(line))
    }
}

/// A draggable section → tactique → placement → creatif tree.
#[derive(IntoElement)]
pub struct DndHierarchy {
    id: ElementId,
    state: Entity<DndHierarchyState>,
    style: StyleRefinement,
    render_item: Rc<
        dyn Fn(usize, &DndHierarchyEntry, DndHierarchyRowState, &mut Window, &mut App) -> ListItem,
    >,
}

impl DndHierarchy {
    pub fn new<R>(state: &Entity<DndHierarchyState>, render_item: R) -> Self
    where
        R: Fn(usize, &DndHierarchyEntry, DndHierarchyRowState, &mut Window, &mut App) -> ListItem
            + 'static,
    {
        Self {
            id: ElementId::Name(format!("dnd-hierarchy-{}", state.entity_id()).into()),
            state: state.clone(),
            style: StyleRefinement::default(),
            render_item: Rc::new(move |ix, entry, row_state, window, cx| {
                render_item(ix, entry, row_state, window, cx)
            }),
        }
    }
}

impl Styled for DndHierarchy {
    fn style(&mut self) -> &mut StyleRefinement {
        &mut self.style
    }
}

impl RenderOnce for DndHierarchy {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        let focus_handle = self.state.read(cx).focus_handle.clone();
        self.state
            .update(cx, |state, _| state.render_item = self.render_item);

        div()
            .id(self.id)
            .key_context(CONTEXT)
            .track_focus(&focus_handle)
            .size_full()
            .child(self.state)
            .refine_style(&self.style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpui_hierarchy_core::Rect;

    fn spec(rect: Rect, direction: InsertionMode) -> IndicatorSpec {
        IndicatorSpec {
            target_id: "T1".into(),
            rect,
            direction,
            target_kind: NodeKind::Tactique,
        }
    }

    #[test]
    fn band_is_relative_to_the_list() {
        let origin = Point {
            x: px(20.),
            y: px(100.),
        };
        let (top, height) = indicator_band(
            &spec(Rect::new(20.0, 156.0, 300.0, 158.0), InsertionMode::After),
            origin,
        );
        assert_eq!(top, px(56.));
        assert_eq!(height, px(2.));

        let (_, height) = indicator_band(
            &spec(Rect::new(20.0, 156.0, 300.0, 156.25), InsertionMode::Before),
            origin,
        );
        assert_eq!(height, px(1.));
    }
}
