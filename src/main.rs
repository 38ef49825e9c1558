mod canvas;
mod codec;
mod color;
mod config;
mod editor;
mod model;
mod session;

use color::{rgb_to_hex, Color};
use config::EditorConfig;
use eframe::egui;
use log::{error, info};
use model::{LampShape, MAX_LAMP_SIZE, MIN_LAMP_SIZE};
use session::Session;
use std::path::{Path, PathBuf};

fn main() -> eframe::Result<()> {
    env_logger::init();

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1280.0, 800.0])
        .with_drag_and_drop(true);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "MAME Layout Editor",
        options,
        Box::new(|_cc| Box::new(EditorApp::default())),
    )
}

struct EditorApp {
    session: Session,
    config: EditorConfig,
    config_path: PathBuf,
    status: String,
}

impl Default for EditorApp {
    fn default() -> Self {
        let config_path = EditorConfig::default_path();
        let config = EditorConfig::load_or_default(&config_path);
        info!("Using config at {}", config_path.display());

        Self {
            session: Session::new(),
            config,
            config_path,
            status: "Ready".into(),
        }
    }
}

impl EditorApp {
    fn save_config(&mut self) {
        if let Err(e) = self.config.save(&self.config_path) {
            error!("Config save error: {:#}", e);
        }
    }

    fn open_dialog(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("MAME layout", &["lay", "xml"]);
        if let Some(dir) = &self.config.last_directory {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.pick_file() {
            self.open_path(&path);
        }
    }

    fn open_path(&mut self, path: &Path) {
        match self.session.open_file(path) {
            Ok(()) => {
                self.status = format!("Opened {}", path.display());
                self.config.remember_file(path);
                self.save_config();
            }
            Err(e) => {
                // The previous project stays live
                self.status = format!("Open failed: {:#}", e);
                error!("Failed to open {}: {:#}", path.display(), e);
            }
        }
    }

    fn export(&mut self) {
        match self.session.export() {
            Some(result) => self.report_export(result),
            None => self.export_as(),
        }
    }

    fn export_as(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .set_file_name(self.session.suggested_export_name())
            .add_filter("MAME layout", &["lay"]);
        if let Some(dir) = &self.config.last_directory {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.save_file() {
            let result = self.session.export_to(&path);
            self.report_export(result);
        }
    }

    fn report_export(&mut self, result: anyhow::Result<PathBuf>) {
        match result {
            Ok(path) => {
                self.status = format!("Exported to {}", path.display());
                self.config.remember_file(&path);
                self.save_config();
            }
            Err(e) => {
                self.status = format!("Export failed: {:#}", e);
                error!("Export error: {:#}", e);
            }
        }
    }

    fn header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("MAME Layout Editor");
            ui.separator();
            match self.session.filename() {
                Some(name) => {
                    let marker = if self.session.has_unsaved_changes() { " *" } else { "" };
                    ui.label(format!("{}{}", name, marker));
                }
                None if self.session.has_project() => {
                    ui.label("Untitled");
                }
                None => {
                    ui.weak("No file loaded");
                }
            }
            if let Some(project) = self.session.editor().project() {
                ui.separator();
                ui.weak(format!("{} lamps, {} x {}", project.lamps.len(), project.width, project.height));
            }
        });
    }

    fn sidebar(&mut self, ui: &mut egui::Ui) {
        let full = egui::vec2(ui.available_width(), 0.0);
        if ui.add(egui::Button::new("New project").min_size(full)).clicked() {
            self.session.new_project();
            self.status = "New project".into();
        }
        if ui.add(egui::Button::new("Open .lay").min_size(full)).clicked() {
            self.open_dialog();
        }
        let has_project = self.session.has_project();
        if ui.add_enabled(has_project, egui::Button::new("Add lamp").min_size(full)).clicked() {
            self.session.editor_mut().add_lamp(None);
        }
        let export_hint = match self.session.export_path() {
            Some(path) => format!("Overwrite {}", path.display()),
            None => "Choose where to export".to_string(),
        };
        if ui
            .add_enabled(has_project, egui::Button::new("Export .lay").min_size(full))
            .on_hover_text(export_hint)
            .clicked()
        {
            self.export();
        }
        if ui.add_enabled(has_project, egui::Button::new("Export .lay as...").min_size(full)).clicked() {
            self.export_as();
        }
        if ui.add_enabled(has_project, egui::Button::new("Close").min_size(full)).clicked() {
            self.session.clear();
        }

        ui.separator();
        if ui.checkbox(&mut self.config.show_grid, "Show grid").changed() {
            self.save_config();
        }

        ui.separator();
        ui.label(egui::RichText::new("RECENT").small().weak());
        let mut reopen = None;
        for path in &self.config.recent_files {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            if ui.link(name).on_hover_text(path.display().to_string()).clicked() {
                reopen = Some(path.clone());
            }
        }
        if let Some(path) = reopen {
            self.open_path(&path);
        }

        ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
            ui.small(&self.status);
        });
    }

    fn inspector(&mut self, ui: &mut egui::Ui) {
        ui.heading("Inspector");
        ui.add_space(6.0);

        let editor = self.session.editor_mut();
        let Some(lamp) = editor.primary_lamp().cloned() else {
            ui.weak("Select a lamp to edit its properties.");
            return;
        };
        let id = lamp.id.as_str();

        ui.label("Name");
        let mut name = lamp.name.clone();
        if ui.text_edit_singleline(&mut name).changed() {
            editor.rename_lamp(id, name);
        }

        let (mut x, mut y) = (lamp.x, lamp.y);
        let (mut w, mut h) = (lamp.width, lamp.height);
        egui::Grid::new("lamp_geometry").num_columns(4).show(ui, |ui| {
            ui.label("X");
            let moved_x = ui.add(egui::DragValue::new(&mut x)).changed();
            ui.label("Y");
            let moved_y = ui.add(egui::DragValue::new(&mut y)).changed();
            ui.end_row();
            ui.label("Width");
            let sized_w = ui
                .add(egui::DragValue::new(&mut w).clamp_range(MIN_LAMP_SIZE..=MAX_LAMP_SIZE))
                .changed();
            ui.label("Height");
            let sized_h = ui
                .add(egui::DragValue::new(&mut h).clamp_range(MIN_LAMP_SIZE..=MAX_LAMP_SIZE))
                .changed();
            ui.end_row();

            if moved_x || moved_y {
                editor.move_lamp(id, x, y);
            }
            if sized_w || sized_h {
                editor.resize_lamp(id, w, h);
            }
        });

        ui.add_space(6.0);
        let mut shape = lamp.shape;
        egui::ComboBox::from_label("Shape")
            .selected_text(shape.label())
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut shape, LampShape::Rectangle, LampShape::Rectangle.label());
                ui.selectable_value(&mut shape, LampShape::Disc, LampShape::Disc.label());
            });
        if shape != lamp.shape {
            editor.set_lamp_shape(id, shape);
        }

        ui.add_space(6.0);
        ui.label("Lamp colors");
        let mut off = lamp.off_color.rgb();
        let mut on = lamp.on_color.rgb();
        let changed = ui
            .horizontal(|ui| {
                ui.label("Off");
                let off_changed = ui.color_edit_button_srgb(&mut off).changed();
                ui.label("On");
                let on_changed = ui.color_edit_button_srgb(&mut on).changed();
                off_changed || on_changed
            })
            .inner;
        if changed {
            editor.recolor_lamp(
                id,
                Color::new(rgb_to_hex(on), lamp.on_color.alpha),
                Color::new(rgb_to_hex(off), lamp.off_color.alpha),
            );
        }
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Dropped layout files open directly
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw.dropped_files.iter().filter_map(|f| f.path.clone()).collect()
        });
        if let Some(path) = dropped.first() {
            self.open_path(path);
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| self.header(ui));

        egui::SidePanel::left("sidebar")
            .exact_width(220.0)
            .show(ctx, |ui| self.sidebar(ui));

        egui::SidePanel::right("inspector")
            .exact_width(280.0)
            .show(ctx, |ui| self.inspector(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                canvas::show(ui, self.session.editor_mut(), &self.config);
            });
        });
    }
}
