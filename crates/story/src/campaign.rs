use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::ActiveTheme as _;
use gpui_component::list::ListItem;
use gpui_component::{h_flex, v_flex};
use gpui_dnd_hierarchy::{
    DndHierarchyEntry, DndHierarchyEvent, DndHierarchyIndicatorCap, DndHierarchyRowState,
    DndHierarchyState, dnd_hierarchy,
};
use gpui_hierarchy_core::{DndConfig, Hierarchy, InsertionMode, MoveRecord, NodeKind};

const CAMPAIGN: &str = include_str!("../fixtures/campaign.json");

pub struct CampaignExample {
    tree: Entity<DndHierarchyState>,
    moves: Vec<MoveRecord>,
    _subscriptions: Vec<Subscription>,
}

impl CampaignExample {
    pub fn view(_window: &mut Window, cx: &mut App) -> Entity<Self> {
        let campaign = load_campaign();
        let tree = cx.new(|cx| {
            DndHierarchyState::new(cx)
                .config(DndConfig::default())
                .indent_width(px(16.))
                .indent_offset(px(10.))
                .indicator_color(cx.theme().foreground)
                .indicator_thickness(px(2.))
                .indicator_cap(DndHierarchyIndicatorCap::StartAndEndBars {
                    width: px(2.),
                    height: px(8.),
                })
                .hierarchy(campaign)
        });

        cx.new(|cx| {
            let subscriptions = vec![cx.subscribe(
                &tree,
                |this: &mut Self, _, event: &DndHierarchyEvent, cx| match event {
                    DndHierarchyEvent::Moved(record) => {
                        this.moves.push(record.clone());
                        cx.notify();
                    }
                },
            )];
            Self {
                tree,
                moves: Vec::new(),
                _subscriptions: subscriptions,
            }
        })
    }
}

fn load_campaign() -> Hierarchy {
    match serde_json::from_str::<Hierarchy>(CAMPAIGN) {
        Ok(tree) => tree,
        Err(err) => {
            tracing::error!(%err, "bundled campaign is invalid, starting empty");
            Hierarchy::new()
        }
    }
}

impl Render for CampaignExample {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let tree = self.tree.read(cx);
        let tree_dump = format_tree(tree.tree());
        let total = tree.tree().total_budget();
        let selected = tree
            .selected_entry()
            .map(|entry| format!("{} ({})", entry.label(), entry.kind().label()))
            .unwrap_or_else(|| "<none>".to_string());
        let moves: Vec<String> = self.moves.iter().rev().map(format_move).collect();

        v_flex()
            .size_full()
            .p(px(16.))
            .gap_y_3()
            .child(
                v_flex()
                    .gap_y_1()
                    .child(
                        div()
                            .text_xl()
                            .font_weight(FontWeight::BOLD)
                            .child("Campaign hierarchy"),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child("Drag a row onto the top quarter of another row to insert before it, the bottom quarter to insert after it, and the middle to nest it. Only section → tactique → placement → creatif nesting is accepted; budgets roll up after every drop."),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child(format!(
                                "Selected: {selected} · Total: {}",
                                format_budget(total)
                            )),
                    ),
            )
            .child(
                h_flex()
                    .flex_1()
                    .min_h(px(0.))
                    .gap_x_3()
                    .child(
                        v_flex()
                            .w(px(460.))
                            .min_w(px(0.))
                            .h_full()
                            .gap_y_2()
                            .child(div().text_sm().font_weight(FontWeight::MEDIUM).child("Plan"))
                            .child(
                                div()
                                    .flex_1()
                                    .min_h(px(0.))
                                    .rounded(px(12.))
                                    .border_1()
                                    .border_color(theme.border)
                                    .bg(theme.background)
                                    .child(dnd_hierarchy(
                                        &self.tree,
                                        move |ix, entry, row_state, _window, cx| {
                                            render_row(ix, entry, row_state, cx)
                                        },
                                    )),
                            ),
                    )
                    .child(
                        v_flex()
                            .flex_1()
                            .min_w(px(0.))
                            .h_full()
                            .gap_y_2()
                            .child(div().text_sm().font_weight(FontWeight::MEDIUM).child("Tree"))
                            .child(
                                div()
                                    .flex_1()
                                    .min_h(px(0.))
                                    .rounded(px(12.))
                                    .border_1()
                                    .border_color(theme.border)
                                    .bg(theme.background)
                                    .p(px(12.))
                                    .child(render_lines(tree_dump.lines())),
                            )
                            .child(div().text_sm().font_weight(FontWeight::MEDIUM).child("Moves"))
                            .child(
                                div()
                                    .h(px(160.))
                                    .rounded(px(12.))
                                    .border_1()
                                    .border_color(theme.border)
                                    .bg(theme.background)
                                    .p(px(12.))
                                    .child(render_lines(moves.iter().map(String::as_str))),
                            ),
                    ),
            )
    }
}

fn render_row(
    ix: usize,
    entry: &DndHierarchyEntry,
    row_state: DndHierarchyRowState,
    cx: &mut App,
) -> ListItem {
    let theme = cx.theme();
    let indent = px(16.) * entry.depth();
    let marker = match (entry.is_container(), entry.is_expanded()) {
        (true, true) => "▾",
        (true, false) => "▸",
        (false, _) => "•",
    };
    let kind_color = match entry.kind() {
        NodeKind::Section => theme.foreground,
        NodeKind::Tactique | NodeKind::Placement => theme.muted_foreground,
        NodeKind::Creatif => theme.accent_foreground,
    };

    ListItem::new(ix)
        .pl(px(10.) + indent)
        .when(row_state.dragging, |this| this.opacity(0.4))
        .when(row_state.drop_target == Some(InsertionMode::Inside), |this| {
            this.border_1().border_color(theme.drag_border)
        })
        .child(
            h_flex()
                .w_full()
                .gap_x_2()
                .items_center()
                .child(div().w(px(10.)).text_color(kind_color).child(marker))
                .child(
                    div()
                        .flex_1()
                        .when(entry.kind() == NodeKind::Section, |this| {
                            this.font_weight(FontWeight::SEMIBOLD)
                        })
                        .child(entry.label().clone()),
                )
                .child(
                    div()
                        .text_xs()
                        .text_color(theme.muted_foreground)
                        .child(format_budget(entry.budget())),
                ),
        )
}

fn render_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Div {
    let lines = lines.map(|line| div().text_sm().child(line.to_string()));
    v_flex().gap_y_0p5().children(lines)
}

fn format_tree(tree: &Hierarchy) -> String {
    fn walk(tree: &Hierarchy, ids: &[String], depth: usize, out: &mut String) {
        for id in ids {
            let Some(node) = tree.get(id) else {
                continue;
            };
            out.push_str(&"  ".repeat(depth));
            out.push_str(&format!(
                "{}  {}\n",
                node.id(),
                format_budget(node.rollup_budget())
            ));
            walk(tree, node.children(), depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(tree, tree.sections(), 0, &mut out);
    out
}

fn format_move(record: &MoveRecord) -> String {
    let parent = |parent: &Option<String>| parent.clone().unwrap_or_else(|| "<root>".to_string());
    format!(
        "{}: {}[{}] → {}[{}]",
        record.node_id,
        parent(&record.from_parent),
        record.from_index,
        parent(&record.to_parent),
        record.to_index
    )
}

/// `1234567.5` → `1 234 567.50 €`.
fn format_budget(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (ix, digit) in whole.chars().enumerate() {
        if ix > 0 && (whole.len() - ix) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents} €")
}
