//! Paints the editor state with an egui [`Painter`].
//!
//! Everything is drawn from the same [`HitTester`] geometry the editor uses
//! for picking, so what is under the cursor is always what gets highlighted.
//! Editor coordinates are canvas-local; `canvas.min` is added at paint time.

use egui::{
    epaint::CubicBezierShape, pos2, vec2, Align2, Color32, CornerRadius, FontId, Painter, Pos2,
    Rect, Shape, Stroke, StrokeKind, Vec2,
};

use crate::{
    editor::Editor,
    geometry::{compute_cubic_bezier_points, connection_curve},
    hit_test::HitTester,
    interaction::Interaction,
    model::{Connection, Node},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub header: Color32,
    pub header_start: Color32,
    pub output_name: Color32,
    pub selection: Color32,
    pub connection: Color32,
    pub connection_hover: Color32,
    pub connection_default: Color32,
    pub node_fill: Color32,
    pub grid: Color32,
    pub axis: Color32,
    pub text: Color32,
    pub text_dim: Color32,
    pub value_text: Color32,
    pub index_text: Color32,
    pub socket_idle: Color32,
    pub socket_rim: Color32,
    pub input_dot: Color32,
    pub preview: Color32,
    pub marquee_fill: Color32,
    pub disabled_overlay: Color32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            header: Color32::from_rgb(0x24, 0x6a, 0xa2),
            header_start: Color32::from_rgb(0x4c, 0xaf, 0x50),
            output_name: Color32::from_rgb(0x4f, 0x99, 0xd4),
            selection: Color32::from_rgb(0x00, 0x78, 0xd4),
            connection: Color32::from_gray(0x66),
            connection_hover: Color32::from_rgb(0xff, 0x98, 0x00),
            connection_default: Color32::from_rgb(0x4c, 0xaf, 0x50),
            node_fill: Color32::from_gray(0x2b),
            grid: Color32::from_gray(0x3a),
            axis: Color32::from_gray(0x66),
            text: Color32::WHITE,
            text_dim: Color32::from_gray(0x88),
            value_text: Color32::from_gray(0xcc),
            index_text: Color32::from_gray(0x66),
            socket_idle: Color32::from_gray(0x44),
            socket_rim: Color32::from_gray(0x22),
            input_dot: Color32::from_gray(0x55),
            preview: Color32::from_rgba_unmultiplied(255, 255, 255, 153),
            marquee_fill: Color32::from_rgba_unmultiplied(0, 120, 212, 26),
            disabled_overlay: Color32::from_rgba_unmultiplied(20, 20, 20, 153),
        }
    }
}

/// Positions of the grid lines inside `[0, extent)` for one axis.
pub fn grid_lines(pan: f32, cell: f32, extent: f32) -> Vec<f32> {
    if cell < 2.0 {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut at = pan.rem_euclid(cell);
    while at < extent {
        lines.push(at);
        at += cell;
    }
    lines
}

/// Shortens `text` with a trailing `...` until it fits `max_width`.
fn fit_text(painter: &Painter, text: &str, font: &FontId, max_width: f32) -> String {
    let width = |s: &str| {
        painter
            .layout_no_wrap(s.to_string(), font.clone(), Color32::WHITE)
            .size()
            .x
    };
    if width(text) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        let candidate: String = chars.iter().collect::<String>() + "...";
        if width(&candidate) <= max_width {
            return candidate;
        }
        chars.pop();
    }
    "...".to_string()
}

fn corner_radius(radius: f32) -> u8 {
    radius.round().clamp(0.0, 255.0) as u8
}

struct Canvas<'a> {
    painter: &'a Painter,
    editor: &'a Editor,
    hit: HitTester<'a>,
    palette: &'a Palette,
    offset: Vec2,
    size: Vec2,
    zoom: f32,
}

/// Paints grid, connections, the connection preview, nodes and the marquee
/// into `canvas`.
pub fn paint(painter: &Painter, canvas: Rect, editor: &Editor, palette: &Palette) {
    let painter = painter.with_clip_rect(canvas);
    let view = editor.view();
    let c = Canvas {
        painter: &painter,
        editor,
        hit: editor.hit_tester(),
        palette,
        offset: canvas.min.to_vec2(),
        size: canvas.size(),
        zoom: view.zoom,
    };

    c.grid();
    for link in editor.flowchart().connections() {
        c.connection(&link);
    }
    c.preview();
    for node in editor.flowchart().nodes() {
        c.node(node);
    }
    c.marquee();
}

impl Canvas<'_> {
    fn at(&self, p: Pos2) -> Pos2 {
        p + self.offset
    }

    fn rect(&self, r: Rect) -> Rect {
        r.translate(self.offset)
    }

    fn grid(&self) {
        let pan = self.editor.view().pan;
        let cell = self.editor.config().dims.grid_size * self.zoom;
        let stroke = Stroke::new(1.0, self.palette.grid);
        for x in grid_lines(pan.x, cell, self.size.x) {
            self.painter.line_segment(
                [self.at(pos2(x, 0.0)), self.at(pos2(x, self.size.y))],
                stroke,
            );
        }
        for y in grid_lines(pan.y, cell, self.size.y) {
            self.painter.line_segment(
                [self.at(pos2(0.0, y)), self.at(pos2(self.size.x, y))],
                stroke,
            );
        }

        // World origin axes.
        let axis = Stroke::new(2.0, self.palette.axis);
        if (-50.0..=self.size.x + 50.0).contains(&pan.x) {
            let line = [self.at(pos2(pan.x, 0.0)), self.at(pos2(pan.x, self.size.y))];
            self.painter.extend(Shape::dashed_line(&line, axis, 10.0, 10.0));
        }
        if (-50.0..=self.size.y + 50.0).contains(&pan.y) {
            let line = [self.at(pos2(0.0, pan.y)), self.at(pos2(self.size.x, pan.y))];
            self.painter.extend(Shape::dashed_line(&line, axis, 10.0, 10.0));
        }
        if pan.x > -100.0 && pan.x < self.size.x && pan.y > -100.0 && pan.y < self.size.y {
            self.painter.text(
                self.at(pos2(pan.x + 5.0, pan.y + 15.0)),
                Align2::LEFT_BOTTOM,
                "(0, 0)",
                FontId::monospace(12.0),
                self.palette.text_dim,
            );
        }
    }

    fn connection(&self, link: &Connection) {
        let Some((start, end)) = self.hit.connection_endpoints(link) else {
            return;
        };
        let selection = self.editor.selection();
        let hovered = self
            .editor
            .hover()
            .connection
            .is_some_and(|h| h.output == link.output);
        let is_default = self
            .editor
            .flowchart()
            .node(link.source)
            .and_then(|n| n.output(link.output))
            .is_some_and(|o| o.is_default());

        let (color, width) = if selection.contains_connection(link.output) {
            (self.palette.selection, 4.0)
        } else if hovered {
            (self.palette.connection_hover, 4.0)
        } else if is_default {
            (self.palette.connection_default, 3.0)
        } else {
            (self.palette.connection, 2.0)
        };

        let curve = connection_curve(self.at(start), self.at(end));
        self.painter.add(CubicBezierShape::from_points_stroke(
            curve,
            false,
            Color32::TRANSPARENT,
            Stroke::new(width, color),
        ));
        self.painter.circle_filled(self.at(end), 4.0, color);
    }

    fn preview(&self) {
        let Interaction::Connecting {
            source,
            cursor,
            target,
        } = self.editor.interaction()
        else {
            return;
        };
        let flowchart = self.editor.flowchart();
        let Some(node) = flowchart.node(source.node) else {
            return;
        };
        let Some(index) = node.output_index(source.output) else {
            return;
        };
        let start = self.hit.output_socket_pos(node, index);
        let end = (*target)
            .and_then(|t| flowchart.node(t))
            .map_or(*cursor, |t| self.hit.input_pos(t));

        let points: Vec<Pos2> =
            compute_cubic_bezier_points(connection_curve(self.at(start), self.at(end)), 24);
        self.painter.extend(Shape::dashed_line(
            &points,
            Stroke::new(2.0, self.palette.preview),
            5.0,
            5.0,
        ));
    }

    fn node(&self, node: &Node) {
        let dims = &self.editor.config().dims;
        let palette = self.palette;
        let zoom = self.zoom;
        let rect = self.rect(self.hit.node_screen_rect(node));
        let radius = corner_radius(dims.corner_radius * zoom);
        let header_h = dims.header_height * zoom;
        let footer_h = dims.footer_height * zoom;

        self.painter
            .rect_filled(rect, CornerRadius::same(radius), palette.node_fill);
        let header = Rect::from_min_size(rect.min, vec2(rect.width(), header_h));
        let header_color = if node.is_start() {
            palette.header_start
        } else {
            palette.header
        };
        self.painter.rect_filled(
            header,
            CornerRadius {
                nw: radius,
                ne: radius,
                sw: 0,
                se: 0,
            },
            header_color,
        );

        let connect_target = matches!(
            self.editor.interaction(),
            Interaction::Connecting { target: Some(t), .. } if *t == node.sid
        );
        let outline = if self.editor.selection().contains_node(node.sid) {
            Stroke::new(3.0, palette.selection)
        } else if connect_target {
            Stroke::new(3.0, palette.connection_hover)
        } else {
            Stroke::new(1.0, node.visual.border_color)
        };
        self.painter
            .rect_stroke(rect, CornerRadius::same(radius), outline, StrokeKind::Middle);

        let caption = if node.caption.is_empty() {
            "Node"
        } else {
            node.caption.as_str()
        };
        self.painter.with_clip_rect(header.intersect(self.painter.clip_rect())).text(
            pos2(rect.left() + 10.0 * zoom, header.center().y),
            Align2::LEFT_CENTER,
            caption,
            FontId::proportional((13.0 * zoom).max(10.0)),
            palette.text,
        );

        let input = self.at(self.hit.input_pos(node));
        self.painter
            .with_clip_rect(rect.intersect(self.painter.clip_rect()))
            .circle_filled(input, 5.0 * zoom, palette.input_dot);

        let name_color = if node.is_start() {
            palette.header_start
        } else {
            palette.output_name
        };
        let mut active = 0;
        for index in 0..node.outputs.len() {
            let label = if node.outputs[index].enabled {
                active += 1;
                active - 1
            } else {
                -1
            };
            self.output_row(node, index, rect, label, name_color);
        }

        if !node.tag.is_empty() {
            self.painter.text(
                pos2(rect.left() + 10.0 * zoom, rect.bottom() - footer_h / 2.0 + 2.0),
                Align2::LEFT_CENTER,
                &node.tag,
                FontId::proportional((11.0 * zoom).max(9.0)),
                palette.text_dim,
            );
        }
        if !node.enabled {
            self.painter
                .rect_filled(rect, CornerRadius::same(radius), palette.disabled_overlay);
        }
    }

    fn output_row(&self, node: &Node, index: usize, rect: Rect, label: i32, name_color: Color32) {
        let output = &node.outputs[index];
        let palette = self.palette;
        let zoom = self.zoom;
        let socket = self.at(self.hit.output_socket_pos(node, index));
        let text_y = socket.y;
        let alpha = if output.enabled { 1.0 } else { 0.4 };
        let fade = |c: Color32| c.gamma_multiply(alpha);
        let font_size = (12.0 * zoom).max(9.0);
        let strike = |text_rect: Rect, color: Color32| {
            if !output.enabled {
                self.painter.line_segment(
                    [
                        pos2(text_rect.left(), text_y),
                        pos2(text_rect.right(), text_y),
                    ],
                    Stroke::new(1.0, fade(color)),
                );
            }
        };

        self.painter.text(
            pos2(rect.left() + 10.0 * zoom, text_y),
            Align2::LEFT_CENTER,
            format!("#{label}"),
            FontId::monospace(font_size),
            fade(palette.index_text),
        );

        let mut right = rect.right() - 15.0 * zoom;
        let left_boundary = rect.left() + 45.0 * zoom;
        if output.is_default() {
            let tag = self.painter.text(
                pos2(right, text_y),
                Align2::RIGHT_CENTER,
                " (Default)",
                FontId::proportional((10.0 * zoom).max(8.0)),
                fade(palette.connection_default),
            );
            right -= tag.width();
        }

        let name_font = FontId::proportional(font_size);
        if !output.value.is_empty() {
            let name_width = self
                .painter
                .layout_no_wrap(output.name.clone(), name_font.clone(), name_color)
                .size()
                .x;
            let room = right - left_boundary - name_width - 10.0 * zoom;
            let value = format!(": {}", output.value.replace('\n', " "));
            let value = fit_text(self.painter, &value, &name_font, room);
            let drawn = self.painter.text(
                pos2(right, text_y),
                Align2::RIGHT_CENTER,
                value,
                name_font.clone(),
                fade(palette.value_text),
            );
            strike(drawn, palette.value_text);
            right -= drawn.width();
        }

        let drawn = self.painter.text(
            pos2(right, text_y),
            Align2::RIGHT_CENTER,
            &output.name,
            name_font,
            fade(name_color),
        );
        strike(drawn, name_color);

        let hovered = self
            .editor
            .hover()
            .output
            .is_some_and(|h| h.output == output.sid);
        let fill = if hovered {
            Color32::WHITE
        } else if output.next.is_some() {
            palette.selection
        } else {
            palette.socket_idle
        };
        let dot = self.editor.config().dims.socket_radius * zoom;
        self.painter.circle(
            socket,
            dot,
            fade(fill),
            Stroke::new(1.0, fade(palette.socket_rim)),
        );
    }

    fn marquee(&self) {
        let Some(marquee) = self.editor.interaction().marquee_rect() else {
            return;
        };
        let rect = self.rect(marquee);
        self.painter
            .rect_filled(rect, CornerRadius::ZERO, self.palette.marquee_fill);
        let outline = [
            rect.left_top(),
            rect.right_top(),
            rect.right_bottom(),
            rect.left_bottom(),
            rect.left_top(),
        ];
        self.painter.extend(Shape::dashed_line(
            &outline,
            Stroke::new(1.0, self.palette.selection),
            4.0,
            4.0,
        ));
    }
}
