use gpui::{
    Bounds, Context, IntoElement, ParentElement as _, Pixels, Render, SharedString, Styled as _,
    Window, div, px,
};
use gpui_component::ActiveTheme as _;
use gpui_hierarchy_core::Rect;

pub(crate) struct DragGhost {
    label: SharedString,
}

impl DragGhost {
    pub(crate) fn new(label: SharedString) -> Self {
        Self { label }
    }
}

impl Render for DragGhost {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        div()
            .px(px(10.))
            .py(px(6.))
            .rounded(px(8.))
            .bg(theme.popover)
            .border_1()
            .border_color(theme.border)
            .shadow_md()
            .text_color(theme.popover_foreground)
            .text_sm()
            .child(self.label.clone())
    }
}

/// Window-space element bounds as a hit-test rectangle.
pub(crate) fn bounds_to_rect(bounds: Bounds<Pixels>) -> Rect {
    let x0 = f32::from(bounds.origin.x) as f64;
    let y0 = f32::from(bounds.origin.y) as f64;
    let x1 = f32::from(bounds.origin.x + bounds.size.width) as f64;
    let y1 = f32::from(bounds.origin.y + bounds.size.height) as f64;
    Rect::new(x0, y0, x1, y1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpui::{Point, Size};

    #[test]
    fn bounds_map_to_window_rect() {
        let bounds = Bounds {
            origin: Point {
                x: px(12.),
                y: px(40.),
            },
            size: Size {
                width: px(200.),
                height: px(28.),
            },
        };
        assert_eq!(bounds_to_rect(bounds), Rect::new(12.0, 40.0, 212.0, 68.0));
    }
}
