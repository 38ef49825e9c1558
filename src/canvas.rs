//! egui front end for the [`Editor`]: paints the project and forwards
//! pointer, keyboard and context-menu input in canvas coordinates.

use crate::color::Color;
use crate::config::EditorConfig;
use crate::editor::{ContextAction, Editor, EditorKey, Gesture, Modifiers};
use crate::model::{Lamp, LampShape, HANDLE_RADIUS};
use eframe::egui;
use glam::DVec2;

const SELECTED: egui::Color32 = egui::Color32::from_rgb(52, 211, 153);
const BORDER: egui::Color32 = egui::Color32::from_rgb(51, 65, 85);
const BACKGROUND: egui::Color32 = egui::Color32::from_rgb(2, 6, 23);
const GRID: egui::Color32 = egui::Color32::from_rgb(15, 23, 42);

pub fn to_color32(c: &Color) -> egui::Color32 {
    let [r, g, b] = c.rgb();
    egui::Color32::from_rgba_unmultiplied(r, g, b, (c.alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Maps between screen space and canvas space (origin at the canvas corner).
#[derive(Clone, Copy)]
struct Transform {
    origin: egui::Pos2,
}

impl Transform {
    fn to_canvas(&self, p: egui::Pos2) -> DVec2 {
        DVec2::new((p.x - self.origin.x) as f64, (p.y - self.origin.y) as f64)
    }

    fn to_screen(&self, p: DVec2) -> egui::Pos2 {
        egui::pos2(self.origin.x + p.x as f32, self.origin.y + p.y as f32)
    }

    fn rect(&self, min: DVec2, max: DVec2) -> egui::Rect {
        egui::Rect::from_min_max(self.to_screen(min), self.to_screen(max))
    }
}

pub fn show(ui: &mut egui::Ui, editor: &mut Editor, config: &EditorConfig) {
    let Some(project) = editor.project() else {
        ui.centered_and_justified(|ui| {
            ui.label("Create a new project or open a .lay file to start.");
        });
        return;
    };

    let canvas_size = egui::vec2(project.width as f32, project.height as f32);
    let (response, painter) = ui.allocate_painter(
        canvas_size.max(ui.available_size()),
        egui::Sense::click_and_drag(),
    );
    let xf = Transform { origin: response.rect.min };
    let visible = response.rect.intersect(ui.clip_rect());

    handle_pointer(ui, &response, editor, xf, visible);
    handle_keys(ui, editor);
    paint(&painter, editor, config, xf, canvas_size);

    // Status overlay
    painter.text(
        visible.right_bottom() - egui::vec2(12.0, 12.0),
        egui::Align2::RIGHT_BOTTOM,
        editor.selection_summary(),
        egui::FontId::proportional(12.0),
        egui::Color32::from_gray(220),
    );

    if response.secondary_clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            let point = xf.to_canvas(pos);
            let lamp = editor.project().and_then(|p| p.hit_test(point)).map(|(id, _)| id);
            editor.open_context_menu(point, lamp.as_deref());
        }
    }

    let _ = response.context_menu(|ui| context_menu(ui, editor));
}

fn handle_pointer(
    ui: &egui::Ui,
    response: &egui::Response,
    editor: &mut Editor,
    xf: Transform,
    visible: egui::Rect,
) {
    let (pressed, down, pos, shift) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_down(),
            i.pointer.interact_pos(),
            i.modifiers.shift,
        )
    });

    let Some(pos) = pos else {
        if editor.gesture() != &Gesture::Idle {
            editor.pointer_leave();
        }
        return;
    };
    let point = xf.to_canvas(pos);

    // A gesture only lives while the button is held, whatever events this frame carried
    if editor.gesture() != &Gesture::Idle {
        if !down {
            editor.pointer_up(point);
        } else if !visible.contains(pos) {
            editor.pointer_leave();
        } else {
            editor.pointer_move(point);
            return;
        }
    }

    if pressed && response.hovered() {
        let modifiers = if shift { Modifiers::SHIFT } else { Modifiers::NONE };
        editor.pointer_down(point, modifiers);
        // Press and release landed in the same frame
        if !down {
            editor.pointer_up(point);
        }
    } else if response.hovered() {
        // Keep the paste target current
        editor.pointer_move(point);
    }
}

fn handle_keys(ui: &egui::Ui, editor: &mut Editor) {
    let text_focus = ui.ctx().wants_keyboard_input();
    let mut keys: Vec<EditorKey> = ui.input(|i| {
        i.events
            .iter()
            .filter_map(|e| match e {
                egui::Event::Copy => Some(EditorKey::Copy),
                egui::Event::Cut => Some(EditorKey::Cut),
                egui::Event::Paste(_) => Some(EditorKey::Paste),
                egui::Event::Key { key: egui::Key::Delete, pressed: true, .. } => {
                    Some(EditorKey::Delete)
                }
                egui::Event::Key { key: egui::Key::Escape, pressed: true, .. } => {
                    Some(EditorKey::Escape)
                }
                // Paste with an empty system clipboard arrives as a plain key
                egui::Event::Key { key: egui::Key::V, pressed: true, modifiers, .. }
                    if modifiers.command =>
                {
                    Some(EditorKey::Paste)
                }
                _ => None,
            })
            .collect()
    });

    let mut seen = Vec::new();
    keys.retain(|k| {
        let first = !seen.contains(k);
        seen.push(*k);
        first
    });
    for key in keys {
        editor.handle_key(key, text_focus);
    }
}

fn paint(painter: &egui::Painter, editor: &Editor, config: &EditorConfig, xf: Transform, size: egui::Vec2) {
    let Some(project) = editor.project() else { return };
    let bounds = egui::Rect::from_min_size(xf.origin, size);

    painter.rect_filled(painter.clip_rect(), 0.0, BACKGROUND);
    if config.show_grid && config.grid_spacing >= 4.0 {
        let stroke = egui::Stroke::new(1.0, GRID);
        let mut x = bounds.left();
        while x <= bounds.right() {
            painter.line_segment([egui::pos2(x, bounds.top()), egui::pos2(x, bounds.bottom())], stroke);
            x += config.grid_spacing;
        }
        let mut y = bounds.top();
        while y <= bounds.bottom() {
            painter.line_segment([egui::pos2(bounds.left(), y), egui::pos2(bounds.right(), y)], stroke);
            y += config.grid_spacing;
        }
    }
    painter.rect_stroke(bounds, 0.0, egui::Stroke::new(1.0, BORDER));

    for lamp in &project.lamps {
        paint_lamp(painter, lamp, editor.selection().contains(&lamp.id), xf);
    }

    if let Some((min, max)) = editor.marquee_rect() {
        painter.rect(
            xf.rect(min, max),
            0.0,
            egui::Color32::from_rgba_unmultiplied(52, 211, 153, 25),
            egui::Stroke::new(1.0, SELECTED),
        );
    }
}

fn paint_lamp(painter: &egui::Painter, lamp: &Lamp, selected: bool, xf: Transform) {
    let rect = xf.rect(lamp.position(), lamp.bottom_right());
    let fill = to_color32(&lamp.off_color);
    let stroke = if selected {
        egui::Stroke::new(2.0, SELECTED)
    } else {
        egui::Stroke::new(1.0, BORDER)
    };

    match lamp.shape {
        LampShape::Rectangle => {
            painter.rect(rect, 0.0, fill, stroke);
        }
        LampShape::Disc => {
            painter.add(egui::Shape::convex_polygon(ellipse_points(rect), fill, stroke));
        }
    }

    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        &lamp.name,
        egui::FontId::proportional(10.0),
        egui::Color32::from_rgba_unmultiplied(226, 232, 240, 204),
    );

    painter.circle(
        xf.to_screen(lamp.bottom_right()),
        HANDLE_RADIUS as f32,
        egui::Color32::from_rgb(15, 23, 42),
        egui::Stroke::new(1.0, SELECTED),
    );
}

fn ellipse_points(rect: egui::Rect) -> Vec<egui::Pos2> {
    const SEGMENTS: usize = 48;
    let c = rect.center();
    let (rx, ry) = (rect.width() / 2.0, rect.height() / 2.0);
    (0..SEGMENTS)
        .map(|i| {
            let a = i as f32 / SEGMENTS as f32 * std::f32::consts::TAU;
            egui::pos2(c.x + rx * a.cos(), c.y + ry * a.sin())
        })
        .collect()
}

fn context_menu(ui: &mut egui::Ui, editor: &mut Editor) {
    let sections: [(&str, &[ContextAction]); 3] = [
        ("Lamps", &[ContextAction::AddLamp]),
        ("Order", &[ContextAction::BringToFront, ContextAction::SendToBack]),
        (
            "Edit",
            &[ContextAction::Cut, ContextAction::Copy, ContextAction::Paste, ContextAction::Delete],
        ),
    ];

    for (title, actions) in sections {
        ui.label(egui::RichText::new(title).small().weak());
        for &action in actions {
            let enabled = editor.context_action_enabled(action);
            if ui.add_enabled(enabled, egui::Button::new(action.label())).clicked() {
                editor.run_context_action(action);
                ui.close_menu();
            }
        }
    }
}
