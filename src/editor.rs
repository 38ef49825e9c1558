//! Selection and editing state for the layout canvas.
//!
//! The [`Editor`] owns the live project together with everything the user
//! manipulates around it: the selection, the clipboard, the pointer gesture in
//! progress and the context menu anchor. UI code feeds it pointer, keyboard and
//! menu events in canvas coordinates and reads the project back for painting.
//!
//! Pointer gestures are captured: once a press starts a move, resize or
//! marquee, every later move/release belongs to that gesture. Leaving the
//! canvas ends the gesture exactly like a release does. There is no abort
//! path; whatever was dragged stays where it was released.

use crate::color::Color;
use crate::model::{
    create_empty_project, create_lamp, Lamp, LampId, LampPart, LampShape, LampUpdate, Project,
    MIN_LAMP_SIZE,
};
use glam::DVec2;
use log::{debug, info};

/// Distance between successive plain pastes.
pub const PASTE_STEP: f64 = 16.0;

/// Selected lamp ids in selection order, plus the focused one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    ids: Vec<LampId>,
    primary: Option<LampId>,
}

impl Selection {
    pub fn ids(&self) -> &[LampId] {
        &self.ids
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Duplicates are dropped. The primary falls back to the first id when
    /// missing or not part of the set.
    fn set(&mut self, ids: impl IntoIterator<Item = LampId>, primary: Option<LampId>) {
        let mut deduped: Vec<LampId> = Vec::new();
        for id in ids {
            if !deduped.contains(&id) {
                deduped.push(id);
            }
        }
        self.primary = primary
            .filter(|p| deduped.contains(p))
            .or_else(|| deduped.first().cloned());
        self.ids = deduped;
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.primary = None;
    }

    fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.ids.retain(|id| keep(id));
        if self.primary.as_ref().is_some_and(|p| !self.ids.contains(p)) {
            self.primary = self.ids.first().cloned();
        }
    }
}

/// Deep copies of lamps, independent of the project they came from.
#[derive(Clone, Debug, Default)]
pub struct Clipboard {
    lamps: Vec<Lamp>,
    paste_count: u32,
}

impl Clipboard {
    pub fn is_empty(&self) -> bool {
        self.lamps.is_empty()
    }

    fn store(&mut self, lamps: Vec<Lamp>) {
        self.lamps = lamps;
        self.paste_count = 0;
    }

    fn min_corner(&self) -> Option<DVec2> {
        self.lamps.iter().map(Lamp::position).reduce(|a, b| a.min(b))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false };
    pub const SHIFT: Modifiers = Modifiers { shift: true };
}

/// The pointer interaction in progress.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    Move {
        start: DVec2,
        origins: Vec<(LampId, DVec2)>,
    },
    Resize {
        start: DVec2,
        id: LampId,
        origin_size: DVec2,
    },
    Marquee {
        start: DVec2,
        current: DVec2,
        additive: bool,
        base: Vec<LampId>,
        moved: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorKey {
    Delete,
    Copy,
    Cut,
    Paste,
    Escape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextAction {
    AddLamp,
    BringToFront,
    SendToBack,
    Cut,
    Copy,
    Paste,
    Delete,
}

impl ContextAction {
    pub fn label(&self) -> &'static str {
        match self {
            ContextAction::AddLamp => "Lamp",
            ContextAction::BringToFront => "Bring To Front",
            ContextAction::SendToBack => "Send To Back",
            ContextAction::Cut => "Cut",
            ContextAction::Copy => "Copy",
            ContextAction::Paste => "Paste",
            ContextAction::Delete => "Delete",
        }
    }
}

#[derive(Default)]
pub struct Editor {
    project: Option<Project>,
    selection: Selection,
    clipboard: Clipboard,
    gesture: Gesture,
    last_pointer: Option<DVec2>,
    /// Open context menu anchor
    context_menu: Option<DVec2>,
    /// Where the last context menu was opened; outlives the menu itself
    context_point: Option<DVec2>,
    revision: u64,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Bumped on every project mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn primary_lamp(&self) -> Option<&Lamp> {
        let id = self.selection.primary()?;
        self.project.as_ref()?.lamp(id)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // PROJECT LIFECYCLE

    /// Replace the live project wholesale. The clipboard survives.
    pub fn load_project(&mut self, project: Project) {
        info!("Editing view {:?} with {} lamps", project.view_name, project.lamps.len());
        self.project = Some(project);
        self.reset_interaction();
        self.touch();
    }

    pub fn new_project(&mut self) {
        self.load_project(create_empty_project());
    }

    pub fn close_project(&mut self) {
        self.project = None;
        self.reset_interaction();
        self.touch();
    }

    fn reset_interaction(&mut self) {
        self.selection.clear();
        self.gesture = Gesture::Idle;
        self.context_menu = None;
        self.context_point = None;
    }

    // SELECTION

    /// Ids not in the project are dropped.
    pub fn set_selection(&mut self, ids: &[LampId], primary: Option<&str>) {
        let Some(project) = &self.project else {
            self.selection.clear();
            return;
        };
        let ids = ids.iter().filter(|id| project.contains(id)).cloned();
        self.selection.set(ids, primary.map(str::to_string));
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// "No lamp selected", the lamp's name, or "N lamps selected".
    pub fn selection_summary(&self) -> String {
        match self.selection.len() {
            0 => "No lamp selected".to_string(),
            1 => self
                .project
                .as_ref()
                .and_then(|p| p.lamp(&self.selection.ids()[0]))
                .map(|l| l.name.clone())
                .unwrap_or_else(|| "1 lamp selected".to_string()),
            n => format!("{} lamps selected", n),
        }
    }

    // LAMP EDITS

    /// New lamp with factory defaults, selected on its own.
    pub fn add_lamp(&mut self, position: Option<DVec2>) -> Option<LampId> {
        let index = self.project.as_ref()?.lamps.len();
        let lamp = create_lamp(index, position);
        let id = lamp.id.clone();
        self.add_lamps(vec![lamp]);
        Some(id)
    }

    /// Append lamps on top of everything and select them.
    pub fn add_lamps(&mut self, lamps: Vec<Lamp>) {
        let Some(project) = self.project.as_mut() else { return };
        if lamps.is_empty() {
            return;
        }
        let ids: Vec<LampId> = lamps.iter().map(|l| l.id.clone()).collect();
        project.add_lamps(lamps);
        self.selection.set(ids, None);
        self.touch();
    }

    /// Remove lamps and prune them from the selection.
    pub fn delete_lamps(&mut self, ids: &[LampId]) -> usize {
        let Some(project) = self.project.as_mut() else { return 0 };
        let removed = project.remove_lamps(ids);
        if removed > 0 {
            self.selection.retain(|id| !ids.iter().any(|d| d == id));
            debug!("Deleted {} lamps", removed);
            self.touch();
        }
        removed
    }

    /// Unknown ids are silently ignored.
    pub fn update_lamp(&mut self, id: &str, update: LampUpdate) -> bool {
        let Some(project) = self.project.as_mut() else { return false };
        let before = project.lamp(id).cloned();
        let applied = project.apply(id, update);
        if applied && project.lamp(id) != before.as_ref() {
            self.touch();
        }
        applied
    }

    pub fn rename_lamp(&mut self, id: &str, name: impl Into<String>) -> bool {
        self.update_lamp(id, LampUpdate::Name(name.into()))
    }

    pub fn move_lamp(&mut self, id: &str, x: f64, y: f64) -> bool {
        self.update_lamp(id, LampUpdate::Position { x, y })
    }

    /// Sizes are clamped to the legal range; callers may get a larger lamp
    /// than they asked for.
    pub fn resize_lamp(&mut self, id: &str, width: f64, height: f64) -> bool {
        self.update_lamp(id, LampUpdate::Size { width, height })
    }

    pub fn set_lamp_shape(&mut self, id: &str, shape: LampShape) -> bool {
        self.update_lamp(id, LampUpdate::Shape(shape))
    }

    pub fn recolor_lamp(&mut self, id: &str, on: Color, off: Color) -> bool {
        self.update_lamp(id, LampUpdate::Colors { on, off })
    }

    pub fn bring_to_front(&mut self, id: &str) -> bool {
        let changed = self.project.as_mut().is_some_and(|p| p.bring_to_front(id));
        if changed {
            self.touch();
        }
        changed
    }

    pub fn send_to_back(&mut self, id: &str) -> bool {
        let changed = self.project.as_mut().is_some_and(|p| p.send_to_back(id));
        if changed {
            self.touch();
        }
        changed
    }

    // CLIPBOARD

    /// Snapshot the given lamps (in paint order). Does nothing for an empty set.
    pub fn copy(&mut self, ids: &[LampId]) -> bool {
        let Some(project) = &self.project else { return false };
        let copied: Vec<Lamp> = project
            .lamps
            .iter()
            .filter(|l| ids.contains(&l.id))
            .cloned()
            .collect();
        if copied.is_empty() {
            return false;
        }
        debug!("Copied {} lamps", copied.len());
        self.clipboard.store(copied);
        true
    }

    pub fn cut(&mut self, ids: &[LampId]) -> bool {
        if !self.copy(ids) {
            return false;
        }
        self.delete_lamps(ids);
        true
    }

    /// Paste fresh copies of the clipboard and select them.
    ///
    /// With a target the group's top-left corner lands on it and the cascade
    /// restarts. Without one, each paste steps a further [`PASTE_STEP`] away
    /// from the copied positions.
    pub fn paste(&mut self, target: Option<DVec2>) -> Vec<LampId> {
        if self.project.is_none() {
            return Vec::new();
        }
        let Some(min) = self.clipboard.min_corner() else {
            return Vec::new();
        };

        let offset = match target {
            Some(t) => {
                self.clipboard.paste_count = 0;
                t - min
            }
            None => {
                let step = PASTE_STEP * (self.clipboard.paste_count + 1) as f64;
                self.clipboard.paste_count += 1;
                DVec2::splat(step)
            }
        };

        let pasted: Vec<Lamp> = self.clipboard.lamps.iter().map(|l| l.duplicate(offset)).collect();
        let ids: Vec<LampId> = pasted.iter().map(|l| l.id.clone()).collect();
        self.add_lamps(pasted);
        ids
    }

    pub fn copy_selection(&mut self) -> bool {
        let ids = self.selection.ids().to_vec();
        self.copy(&ids)
    }

    pub fn cut_selection(&mut self) -> bool {
        let ids = self.selection.ids().to_vec();
        self.cut(&ids)
    }

    pub fn delete_selection(&mut self) -> usize {
        let ids = self.selection.ids().to_vec();
        self.delete_lamps(&ids)
    }

    // POINTER GESTURES

    /// Primary-button press. Hit-tests the project and dispatches to
    /// [`Editor::press_lamp`] or [`Editor::press_background`].
    pub fn pointer_down(&mut self, point: DVec2, modifiers: Modifiers) {
        let hit = self.project.as_ref().and_then(|p| p.hit_test(point));
        match hit {
            Some((id, part)) => {
                self.press_lamp(&id, part, point, modifiers);
            }
            None => self.press_background(point, modifiers),
        }
    }

    /// Apply the click-selection rule for a lamp, then start dragging it if
    /// it ended up selected. Returns whether a drag started.
    pub fn press_lamp(&mut self, id: &str, part: LampPart, point: DVec2, modifiers: Modifiers) -> bool {
        self.end_gesture();
        self.context_menu = None;
        self.last_pointer = Some(point);

        let Some(project) = &self.project else { return false };
        let Some(lamp) = project.lamp(id) else { return false };
        let lamp_origin = (lamp.position(), lamp.size());

        let already = self.selection.contains(id);
        let mut ids = self.selection.ids().to_vec();
        let mut primary = Some(id.to_string());
        if modifiers.shift {
            if already {
                ids.retain(|i| i != id);
                primary = None;
            } else {
                ids.push(id.to_string());
            }
        } else if !already {
            ids = vec![id.to_string()];
        }
        self.selection.set(ids, primary);

        if !self.selection.contains(id) {
            return false;
        }

        self.gesture = match part {
            LampPart::Body => Gesture::Move {
                start: point,
                origins: project
                    .lamps
                    .iter()
                    .filter(|l| self.selection.contains(&l.id))
                    .map(|l| (l.id.clone(), l.position()))
                    .collect(),
            },
            LampPart::ResizeHandle => Gesture::Resize {
                start: point,
                id: id.to_string(),
                origin_size: lamp_origin.1,
            },
        };
        true
    }

    /// Press on empty canvas: clears the selection unless shift is held,
    /// then starts a marquee.
    pub fn press_background(&mut self, point: DVec2, modifiers: Modifiers) {
        self.end_gesture();
        self.context_menu = None;
        self.last_pointer = Some(point);
        if self.project.is_none() {
            return;
        }

        let base = self.selection.ids().to_vec();
        if !modifiers.shift {
            self.selection.clear();
        }
        self.gesture = Gesture::Marquee {
            start: point,
            current: point,
            additive: modifiers.shift,
            base,
            moved: false,
        };
    }

    pub fn pointer_move(&mut self, point: DVec2) {
        self.last_pointer = Some(point);
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Move { start, origins } => {
                let delta = point - *start;
                let targets: Vec<(LampId, DVec2)> =
                    origins.iter().map(|(id, origin)| (id.clone(), *origin + delta)).collect();
                let Some(project) = self.project.as_mut() else { return };
                let mut changed = false;
                for (id, pos) in targets {
                    if project.lamp(&id).is_some_and(|l| l.position() != pos) {
                        changed |= project.move_lamp(&id, pos.x, pos.y);
                    }
                }
                if changed {
                    self.touch();
                }
            }
            Gesture::Resize { start, id, origin_size } => {
                let size = (*origin_size + (point - *start)).max(DVec2::splat(MIN_LAMP_SIZE));
                let id = id.clone();
                self.resize_lamp(&id, size.x, size.y);
            }
            Gesture::Marquee { current, moved, .. } => {
                *current = point;
                *moved = true;
            }
        }
    }

    /// Release ends the gesture; a marquee that moved commits its selection.
    pub fn pointer_up(&mut self, point: DVec2) {
        self.last_pointer = Some(point);
        self.end_gesture();
    }

    /// The pointer left the canvas; treated as a release.
    pub fn pointer_leave(&mut self) {
        self.end_gesture();
    }

    fn end_gesture(&mut self) {
        let gesture = std::mem::take(&mut self.gesture);
        if let Gesture::Marquee { start, current, additive, base, moved: true } = gesture {
            let Some(project) = &self.project else { return };
            let inside = project.lamps_within(start, current);
            let ids = if additive { base.into_iter().chain(inside).collect() } else { inside };
            self.set_selection(&ids, None);
        }
    }

    /// Corners of the marquee while one is being dragged.
    pub fn marquee_rect(&self) -> Option<(DVec2, DVec2)> {
        match &self.gesture {
            Gesture::Marquee { start, current, moved: true, .. } => {
                Some((start.min(*current), start.max(*current)))
            }
            _ => None,
        }
    }

    // KEYBOARD

    /// Returns whether the key did something. Keys are ignored while a text
    /// field owns the keyboard.
    pub fn handle_key(&mut self, key: EditorKey, text_focus: bool) -> bool {
        if text_focus || self.project.is_none() {
            return false;
        }
        let handled = match key {
            EditorKey::Delete => !self.selection.is_empty() && self.delete_selection() > 0,
            EditorKey::Copy => return self.copy_selection(),
            EditorKey::Cut => self.cut_selection(),
            EditorKey::Paste => !self.paste(self.last_pointer).is_empty(),
            EditorKey::Escape => {
                let had = !self.selection.is_empty() || self.context_menu.is_some();
                self.close_context_menu();
                self.clear_selection();
                had
            }
        };
        if handled {
            self.context_menu = None;
        }
        handled
    }

    // CONTEXT MENU

    /// Right click at `point`, optionally over a lamp. A lamp outside the
    /// selection becomes the only selection; one inside it becomes primary.
    pub fn open_context_menu(&mut self, point: DVec2, lamp: Option<&str>) {
        if self.project.is_none() {
            return;
        }
        if let Some(id) = lamp {
            if self.selection.contains(id) {
                let ids = self.selection.ids().to_vec();
                self.selection.set(ids, Some(id.to_string()));
            } else {
                self.set_selection(&[id.to_string()], Some(id));
            }
        }
        self.context_point = Some(point);
        self.last_pointer = Some(point);
        self.context_menu = Some(point);
    }

    pub fn close_context_menu(&mut self) {
        self.context_menu = None;
    }

    pub fn context_menu(&self) -> Option<DVec2> {
        self.context_menu
    }

    pub fn context_action_enabled(&self, action: ContextAction) -> bool {
        if self.project.is_none() {
            return false;
        }
        match action {
            ContextAction::AddLamp => true,
            ContextAction::BringToFront | ContextAction::SendToBack => {
                self.selection.primary().is_some()
            }
            ContextAction::Cut | ContextAction::Copy | ContextAction::Delete => {
                !self.selection.is_empty()
            }
            ContextAction::Paste => !self.clipboard.is_empty(),
        }
    }

    /// Run a menu entry. Disabled entries do nothing. The menu closes after
    /// any action that ran.
    pub fn run_context_action(&mut self, action: ContextAction) -> bool {
        if !self.context_action_enabled(action) {
            return false;
        }
        let primary = self.selection.primary().map(str::to_string);
        let ran = match action {
            ContextAction::AddLamp => self.add_lamp(self.context_point).is_some(),
            ContextAction::BringToFront => primary.is_some_and(|id| self.bring_to_front(&id)),
            ContextAction::SendToBack => primary.is_some_and(|id| self.send_to_back(&id)),
            ContextAction::Cut => self.cut_selection(),
            ContextAction::Copy => self.copy_selection(),
            ContextAction::Paste => !self.paste(self.context_point).is_empty(),
            ContextAction::Delete => self.delete_selection() > 0,
        };
        self.context_menu = None;
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> DVec2 {
        DVec2::new(x, y)
    }

    fn editor_with(n: usize) -> Editor {
        let mut e = Editor::new();
        e.new_project();
        for _ in 0..n {
            e.add_lamp(None);
        }
        e.clear_selection();
        e
    }

    fn lamp_ids(e: &Editor) -> Vec<LampId> {
        e.project().map(|p| p.lamps.iter().map(|l| l.id.clone()).collect()).unwrap_or_default()
    }

    fn lamp<'a>(e: &'a Editor, id: &str) -> &'a Lamp {
        e.project().and_then(|p| p.lamp(id)).expect("lamp exists")
    }

    /// Place a lamp exactly, bypassing the cascade.
    fn place(e: &mut Editor, x: f64, y: f64, w: f64, h: f64) -> LampId {
        let id = e.add_lamp(Some(v(x, y))).expect("project is open");
        e.resize_lamp(&id, w, h);
        id
    }

    #[test]
    fn test_add_three_lamps_then_bring_first_to_front() {
        let mut e = Editor::new();
        e.new_project();
        assert_eq!(e.project().map(|p| (p.width, p.height)), Some((800.0, 600.0)));

        for _ in 0..3 {
            e.add_lamp(None);
        }
        let ids = lamp_ids(&e);
        let positions: Vec<(f64, f64)> = ids.iter().map(|id| (lamp(&e, id).x, lamp(&e, id).y)).collect();
        assert_eq!(positions, vec![(80.0, 80.0), (104.0, 104.0), (128.0, 128.0)]);
        for id in &ids {
            let l = lamp(&e, id);
            assert_eq!((l.width, l.height), (60.0, 60.0));
            assert_eq!(l.on_color.hex, "#ff4d4d");
            assert_eq!(l.off_color.hex, "#3b2f33");
        }

        assert!(e.bring_to_front(&ids[0]));
        assert_eq!(lamp_ids(&e), vec![ids[1].clone(), ids[2].clone(), ids[0].clone()]);
    }

    #[test]
    fn test_front_then_back_keeps_others_in_order() {
        let mut e = editor_with(4);
        let ids = lamp_ids(&e);
        e.bring_to_front(&ids[2]);
        e.send_to_back(&ids[2]);
        assert_eq!(lamp_ids(&e), vec![ids[2].clone(), ids[0].clone(), ids[1].clone(), ids[3].clone()]);
    }

    #[test]
    fn test_add_lamp_selects_it() {
        let mut e = editor_with(1);
        let id = e.add_lamp(Some(v(5.0, 6.0))).expect("project is open");
        assert_eq!(e.selection().ids(), &[id.clone()]);
        assert_eq!(e.selection().primary(), Some(id.as_str()));
        assert_eq!(e.selection_summary(), "Lamp 2");
    }

    #[test]
    fn test_no_project_everything_is_noop() {
        let mut e = Editor::new();
        assert_eq!(e.add_lamp(None), None);
        assert!(!e.move_lamp("x", 1.0, 1.0));
        assert!(!e.copy(&["x".to_string()]));
        assert!(e.paste(None).is_empty());
        e.pointer_down(v(1.0, 1.0), Modifiers::NONE);
        assert_eq!(e.gesture(), &Gesture::Idle);
        assert!(!e.handle_key(EditorKey::Delete, false));
    }

    #[test]
    fn test_set_selection_dedupes_and_prunes() {
        let mut e = editor_with(3);
        let ids = lamp_ids(&e);
        let request = vec![ids[1].clone(), ids[0].clone(), ids[1].clone(), "ghost".to_string()];
        e.set_selection(&request, None);
        assert_eq!(e.selection().ids(), &[ids[1].clone(), ids[0].clone()]);
        assert_eq!(e.selection().primary(), Some(ids[1].as_str()));

        e.set_selection(&request, Some("ghost"));
        assert_eq!(e.selection().primary(), Some(ids[1].as_str()), "primary must be a member");

        e.set_selection(&request, Some(ids[0].as_str()));
        assert_eq!(e.selection().primary(), Some(ids[0].as_str()));
        assert_eq!(e.selection_summary(), "2 lamps selected");

        e.clear_selection();
        assert!(e.selection().is_empty());
        assert_eq!(e.selection().primary(), None);
        assert_eq!(e.selection_summary(), "No lamp selected");
    }

    #[test]
    fn test_click_selects_only_that_lamp() {
        let mut e = editor_with(0);
        let a = place(&mut e, 0.0, 0.0, 50.0, 50.0);
        let b = place(&mut e, 100.0, 0.0, 50.0, 50.0);
        e.set_selection(&[a.clone()], None);

        e.pointer_down(v(120.0, 20.0), Modifiers::NONE);
        assert_eq!(e.selection().ids(), &[b.clone()]);
        assert_eq!(e.selection().primary(), Some(b.as_str()));
        assert!(matches!(e.gesture(), Gesture::Move { .. }));
    }

    #[test]
    fn test_click_on_selected_keeps_multi_selection() {
        let mut e = editor_with(0);
        let a = place(&mut e, 0.0, 0.0, 50.0, 50.0);
        let b = place(&mut e, 100.0, 0.0, 50.0, 50.0);
        e.set_selection(&[a.clone(), b.clone()], Some(a.as_str()));

        e.pointer_down(v(120.0, 20.0), Modifiers::NONE);
        assert_eq!(e.selection().ids(), &[a.clone(), b.clone()]);
        assert_eq!(e.selection().primary(), Some(b.as_str()), "clicked lamp takes focus");
    }

    #[test]
    fn test_shift_click_adds_to_selection() {
        let mut e = editor_with(0);
        let a = place(&mut e, 0.0, 0.0, 50.0, 50.0);
        let b = place(&mut e, 100.0, 0.0, 50.0, 50.0);
        e.set_selection(&[a.clone()], None);

        e.pointer_down(v(120.0, 20.0), Modifiers::SHIFT);
        assert_eq!(e.selection().ids(), &[a.clone(), b.clone()]);
        assert_eq!(e.selection().primary(), Some(b.as_str()));
        assert!(matches!(e.gesture(), Gesture::Move { .. }));
    }

    #[test]
    fn test_shift_click_on_selected_deselects_without_drag() {
        let mut e = editor_with(0);
        let a = place(&mut e, 0.0, 0.0, 50.0, 50.0);
        let b = place(&mut e, 100.0, 0.0, 50.0, 50.0);
        e.set_selection(&[a.clone(), b.clone()], Some(a.as_str()));

        e.pointer_down(v(10.0, 10.0), Modifiers::SHIFT);
        assert_eq!(e.selection().ids(), &[b.clone()]);
        assert_eq!(e.selection().primary(), Some(b.as_str()));
        assert_eq!(e.gesture(), &Gesture::Idle, "deselecting never starts a drag");

        e.pointer_move(v(300.0, 300.0));
        assert_eq!((lamp(&e, &a).x, lamp(&e, &a).y), (0.0, 0.0));
        assert_eq!((lamp(&e, &b).x, lamp(&e, &b).y), (100.0, 0.0));
    }

    #[test]
    fn test_drag_moves_whole_selection_rigidly() {
        let mut e = editor_with(0);
        let a = place(&mut e, 0.0, 0.0, 50.0, 50.0);
        let b = place(&mut e, 100.0, 10.0, 50.0, 50.0);
        let c = place(&mut e, 300.0, 300.0, 50.0, 50.0);
        e.set_selection(&[a.clone(), b.clone()], None);

        e.pointer_down(v(10.0, 10.0), Modifiers::NONE);
        e.pointer_move(v(20.0, 15.0));
        e.pointer_move(v(40.0, -20.0));
        e.pointer_up(v(40.0, -20.0));

        assert_eq!((lamp(&e, &a).x, lamp(&e, &a).y), (30.0, -30.0));
        assert_eq!((lamp(&e, &b).x, lamp(&e, &b).y), (130.0, -20.0));
        assert_eq!((lamp(&e, &c).x, lamp(&e, &c).y), (300.0, 300.0), "unselected lamps stay");
        assert_eq!(e.gesture(), &Gesture::Idle);

        e.pointer_move(v(500.0, 500.0));
        assert_eq!(lamp(&e, &a).x, 30.0, "moves after release do nothing");
    }

    #[test]
    fn test_resize_only_grabbed_lamp_with_floor() {
        let mut e = editor_with(0);
        let a = place(&mut e, 0.0, 0.0, 60.0, 60.0);
        let b = place(&mut e, 100.0, 0.0, 60.0, 60.0);
        e.set_selection(&[a.clone(), b.clone()], None);

        // Grip sits on the bottom-right corner
        e.pointer_down(v(160.0, 60.0), Modifiers::NONE);
        assert!(matches!(e.gesture(), Gesture::Resize { .. }));
        e.pointer_move(v(200.0, 20.0));
        assert_eq!((lamp(&e, &b).width, lamp(&e, &b).height), (100.0, 20.0));
        e.pointer_move(v(50.0, -100.0));
        assert_eq!((lamp(&e, &b).width, lamp(&e, &b).height), (20.0, 20.0));
        assert_eq!((lamp(&e, &b).x, lamp(&e, &b).y), (100.0, 0.0), "top-left is anchored");
        assert_eq!((lamp(&e, &a).width, lamp(&e, &a).height), (60.0, 60.0));
        e.pointer_leave();
        assert_eq!(e.gesture(), &Gesture::Idle);
    }

    #[test]
    fn test_resize_never_goes_below_minimum() {
        let mut e = editor_with(2);
        for id in lamp_ids(&e) {
            for (w, h) in [(0.0, 0.0), (-50.0, 19.9), (20.0, 5000.0), (f64::NAN, 45.0)] {
                e.resize_lamp(&id, w, h);
                let l = lamp(&e, &id);
                assert!(l.width >= 20.0 && l.height >= 20.0);
                assert!(l.width <= 2000.0 && l.height <= 2000.0);
            }
        }
    }

    #[test]
    fn test_background_click_clears_selection_immediately() {
        let mut e = editor_with(0);
        let a = place(&mut e, 0.0, 0.0, 50.0, 50.0);
        e.set_selection(&[a], None);
        e.pointer_down(v(500.0, 500.0), Modifiers::NONE);
        assert!(e.selection().is_empty());
        e.pointer_up(v(500.0, 500.0));
        assert!(e.selection().is_empty());
    }

    #[test]
    fn test_marquee_selects_fully_contained_lamps() {
        let mut e = editor_with(0);
        let inside = place(&mut e, 20.0, 20.0, 30.0, 30.0);
        let _half_out = place(&mut e, 90.0, 20.0, 30.0, 30.0);
        let _outside = place(&mut e, 400.0, 400.0, 30.0, 30.0);

        // Drag from bottom-right to top-left
        e.pointer_down(v(100.0, 100.0), Modifiers::NONE);
        e.pointer_move(v(50.0, 50.0));
        assert!(e.marquee_rect().is_some());
        e.pointer_move(v(10.0, 10.0));
        assert_eq!(e.marquee_rect(), Some((v(10.0, 10.0), v(100.0, 100.0))));
        e.pointer_up(v(10.0, 10.0));

        assert_eq!(e.selection().ids(), &[inside.clone()]);
        assert_eq!(e.selection().primary(), Some(inside.as_str()));
        assert_eq!(e.marquee_rect(), None);
    }

    #[test]
    fn test_shift_marquee_unions_with_previous_selection() {
        let mut e = editor_with(0);
        let far = place(&mut e, 500.0, 500.0, 30.0, 30.0);
        let near = place(&mut e, 20.0, 20.0, 30.0, 30.0);
        e.set_selection(&[far.clone()], None);

        e.pointer_down(v(0.0, 0.0), Modifiers::SHIFT);
        assert_eq!(e.selection().ids(), &[far.clone()], "shift keeps selection during drag");
        e.pointer_move(v(100.0, 100.0));
        e.pointer_leave();

        assert_eq!(e.selection().ids(), &[far, near]);
    }

    #[test]
    fn test_marquee_without_motion_commits_nothing() {
        let mut e = editor_with(0);
        let a = place(&mut e, 20.0, 20.0, 30.0, 30.0);
        e.set_selection(&[a.clone()], None);
        e.pointer_down(v(300.0, 300.0), Modifiers::SHIFT);
        e.pointer_up(v(300.0, 300.0));
        assert_eq!(e.selection().ids(), &[a]);
    }

    #[test]
    fn test_copy_requires_selection() {
        let mut e = editor_with(2);
        assert!(!e.copy_selection());
        assert!(!e.copy(&["ghost".to_string()]));
        assert!(e.clipboard.is_empty());
    }

    #[test]
    fn test_paste_cascades_by_sixteen() {
        let mut e = editor_with(0);
        let a = place(&mut e, 10.0, 20.0, 40.0, 40.0);
        let b = place(&mut e, 60.0, 30.0, 40.0, 40.0);
        assert!(e.copy(&[a.clone(), b.clone()]));

        for step in [16.0, 32.0, 48.0] {
            let pasted = e.paste(None);
            assert_eq!(pasted.len(), 2);
            let first = lamp(&e, &pasted[0]);
            let second = lamp(&e, &pasted[1]);
            assert_eq!((first.x, first.y), (10.0 + step, 20.0 + step));
            assert_eq!((second.x, second.y), (60.0 + step, 30.0 + step));
            assert_eq!(first.name, "Lamp 1 Copy");
            assert_ne!(first.id, a);
            assert_eq!(e.selection().ids(), pasted.as_slice());
            assert_eq!(e.selection().primary(), Some(pasted[0].as_str()));
        }
        assert_eq!(e.project().map(|p| p.lamps.len()), Some(8));
        assert_eq!(e.clipboard.paste_count, 3);
    }

    #[test]
    fn test_paste_at_point_and_reset_cascade() {
        let mut e = editor_with(0);
        let a = place(&mut e, 10.0, 50.0, 40.0, 40.0);
        let b = place(&mut e, 30.0, 20.0, 40.0, 40.0);
        e.copy(&[a, b]);
        e.paste(None);
        e.paste(None);

        let pasted = e.paste(Some(v(200.0, 300.0)));
        let min_x = pasted.iter().map(|id| lamp(&e, id).x).fold(f64::MAX, f64::min);
        let min_y = pasted.iter().map(|id| lamp(&e, id).y).fold(f64::MAX, f64::min);
        assert_eq!((min_x, min_y), (200.0, 300.0));
        assert_eq!((lamp(&e, &pasted[0]).x, lamp(&e, &pasted[0]).y), (200.0, 330.0));
        assert_eq!(e.clipboard.paste_count, 0);

        let next = e.paste(None);
        assert_eq!((lamp(&e, &next[0]).x, lamp(&e, &next[0]).y), (26.0, 66.0));
    }

    #[test]
    fn test_new_copy_resets_cascade() {
        let mut e = editor_with(1);
        let ids = lamp_ids(&e);
        e.copy(&ids);
        e.paste(None);
        e.paste(None);
        e.copy(&ids);
        let pasted = e.paste(None);
        assert_eq!(lamp(&e, &pasted[0]).x, 96.0);
    }

    #[test]
    fn test_clipboard_is_a_deep_snapshot() {
        let mut e = editor_with(1);
        let id = lamp_ids(&e)[0].clone();
        e.copy(&[id.clone()]);
        e.recolor_lamp(&id, Color::new("#0000ff", 1.0), Color::new("#000011", 1.0));
        e.rename_lamp(&id, "Renamed");
        let pasted = e.paste(None);
        let p = lamp(&e, &pasted[0]);
        assert_eq!(p.on_color.hex, "#ff4d4d");
        assert_eq!(p.name, "Lamp 1 Copy");
    }

    #[test]
    fn test_cut_removes_and_pastes_back() {
        let mut e = editor_with(2);
        let ids = lamp_ids(&e);
        e.set_selection(&[ids[0].clone()], None);
        assert!(e.cut_selection());
        assert_eq!(lamp_ids(&e), vec![ids[1].clone()]);
        assert!(e.selection().is_empty());

        e.close_project();
        e.new_project();
        let pasted = e.paste(None);
        assert_eq!(pasted.len(), 1, "clipboard outlives the project");
    }

    #[test]
    fn test_delete_primary_moves_focus() {
        let mut e = editor_with(3);
        let ids = lamp_ids(&e);
        e.set_selection(&ids, Some(ids[1].as_str()));

        e.delete_lamps(&[ids[1].clone()]);
        assert_eq!(e.selection().ids(), &[ids[0].clone(), ids[2].clone()]);
        assert_eq!(e.selection().primary(), Some(ids[0].as_str()));

        e.delete_lamps(&[ids[0].clone(), ids[2].clone()]);
        assert!(e.selection().is_empty());
        assert_eq!(e.selection().primary(), None);
    }

    #[test]
    fn test_drag_survives_deleted_member() {
        let mut e = editor_with(2);
        let ids = lamp_ids(&e);
        e.set_selection(&ids, None);
        e.pointer_down(v(90.0, 90.0), Modifiers::NONE);
        e.delete_lamps(&[ids[1].clone()]);
        e.pointer_move(v(100.0, 100.0));
        assert_eq!(lamp(&e, &ids[0]).x, 90.0);
        assert_eq!(lamp_ids(&e), vec![ids[0].clone()]);
    }

    #[test]
    fn test_keyboard_bindings() {
        let mut e = editor_with(2);
        let ids = lamp_ids(&e);
        e.set_selection(&[ids[0].clone()], None);

        assert!(!e.handle_key(EditorKey::Delete, true), "text fields keep their keys");
        assert_eq!(lamp_ids(&e).len(), 2);

        assert!(e.handle_key(EditorKey::Copy, false));
        e.pointer_move(v(400.0, 250.0));
        assert!(e.handle_key(EditorKey::Paste, false));
        let pasted = e.selection().primary().map(str::to_string).expect("paste selects");
        assert_eq!((lamp(&e, &pasted).x, lamp(&e, &pasted).y), (400.0, 250.0));

        assert!(e.handle_key(EditorKey::Delete, false));
        assert!(e.project().is_some_and(|p| !p.contains(&pasted)));

        e.set_selection(&[ids[1].clone()], None);
        assert!(e.handle_key(EditorKey::Cut, false));
        assert_eq!(lamp_ids(&e), vec![ids[0].clone()]);

        e.clear_selection();
        assert!(!e.handle_key(EditorKey::Delete, false));
    }

    #[test]
    fn test_keyboard_paste_without_pointer_cascades() {
        let mut e = editor_with(1);
        let ids = lamp_ids(&e);
        e.copy(&ids);
        assert!(e.handle_key(EditorKey::Paste, false));
        let pasted = e.selection().primary().map(str::to_string).expect("paste selects");
        assert_eq!(lamp(&e, &pasted).x, 96.0);
    }

    #[test]
    fn test_context_menu_on_unselected_lamp_selects_it() {
        let mut e = editor_with(3);
        let ids = lamp_ids(&e);
        e.set_selection(&[ids[0].clone(), ids[1].clone()], None);

        e.open_context_menu(v(200.0, 200.0), Some(ids[1].as_str()));
        assert_eq!(e.selection().ids(), &[ids[0].clone(), ids[1].clone()]);
        assert_eq!(e.selection().primary(), Some(ids[1].as_str()));

        e.open_context_menu(v(200.0, 200.0), Some(ids[2].as_str()));
        assert_eq!(e.selection().ids(), &[ids[2].clone()]);
        assert_eq!(e.context_menu(), Some(v(200.0, 200.0)));
    }

    #[test]
    fn test_context_actions() {
        let mut e = editor_with(2);
        let ids = lamp_ids(&e);

        e.open_context_menu(v(300.0, 40.0), None);
        assert!(!e.context_action_enabled(ContextAction::BringToFront));
        assert!(!e.context_action_enabled(ContextAction::Paste));
        assert!(!e.run_context_action(ContextAction::Delete));

        assert!(e.run_context_action(ContextAction::AddLamp));
        assert_eq!(e.context_menu(), None);
        let added = e.selection().primary().map(str::to_string).expect("added lamp selected");
        assert_eq!((lamp(&e, &added).x, lamp(&e, &added).y), (300.0, 40.0));

        e.open_context_menu(v(0.0, 0.0), Some(ids[0].as_str()));
        assert!(e.run_context_action(ContextAction::BringToFront));
        assert_eq!(lamp_ids(&e).last(), Some(&ids[0]));
        e.open_context_menu(v(0.0, 0.0), Some(ids[0].as_str()));
        assert!(e.run_context_action(ContextAction::SendToBack));
        assert_eq!(lamp_ids(&e).first(), Some(&ids[0]));

        e.open_context_menu(v(0.0, 0.0), Some(ids[1].as_str()));
        assert!(e.run_context_action(ContextAction::Copy));
        e.open_context_menu(v(500.0, 400.0), None);
        assert!(e.run_context_action(ContextAction::Paste));
        let pasted = e.selection().primary().map(str::to_string).expect("pasted");
        assert_eq!((lamp(&e, &pasted).x, lamp(&e, &pasted).y), (500.0, 400.0));

        e.open_context_menu(v(0.0, 0.0), Some(pasted.as_str()));
        assert!(e.run_context_action(ContextAction::Delete));
        assert!(e.project().is_some_and(|p| !p.contains(&pasted)));
    }

    #[test]
    fn test_press_closes_context_menu() {
        let mut e = editor_with(1);
        e.open_context_menu(v(10.0, 10.0), None);
        e.pointer_down(v(700.0, 500.0), Modifiers::NONE);
        assert_eq!(e.context_menu(), None);
    }

    #[test]
    fn test_load_resets_selection_and_revision_tracks_edits() {
        let mut e = editor_with(2);
        let ids = lamp_ids(&e);
        e.set_selection(&ids, None);
        let before = e.revision();
        e.move_lamp(&ids[0], 1.0, 1.0);
        assert!(e.revision() > before);

        let unchanged = e.revision();
        e.move_lamp("ghost", 1.0, 1.0);
        assert_eq!(e.revision(), unchanged, "no-op mutations don't count");

        e.load_project(create_empty_project());
        assert!(e.selection().is_empty());
        assert_eq!(e.project().map(|p| p.lamps.len()), Some(0));
    }

    #[test]
    fn test_holding_still_does_not_bump_revision() {
        let mut e = editor_with(0);
        let id = place(&mut e, 100.0, 100.0, 60.0, 60.0);
        let before = e.revision();

        e.pointer_down(v(120.0, 120.0), Modifiers::NONE);
        for _ in 0..3 {
            e.pointer_move(v(120.0, 120.0));
        }
        e.pointer_up(v(120.0, 120.0));
        assert_eq!(e.revision(), before);

        e.pointer_down(v(160.0, 160.0), Modifiers::NONE);
        assert!(matches!(e.gesture(), Gesture::Resize { .. }));
        e.pointer_move(v(160.0, 160.0));
        e.pointer_up(v(160.0, 160.0));
        assert_eq!(e.revision(), before);

        let name = lamp(&e, &id).name.clone();
        assert!(e.rename_lamp(&id, name), "known id still reports applied");
        assert_eq!(e.revision(), before);

        e.pointer_down(v(120.0, 120.0), Modifiers::NONE);
        e.pointer_move(v(125.0, 120.0));
        assert!(e.revision() > before);
    }

    #[test]
    fn test_escape_clears_selection_and_menu() {
        let mut e = editor_with(2);
        let ids = lamp_ids(&e);
        e.set_selection(&ids, None);
        e.open_context_menu(v(10.0, 10.0), None);

        assert!(!e.handle_key(EditorKey::Escape, true), "text fields keep escape");
        assert!(e.handle_key(EditorKey::Escape, false));
        assert!(e.selection().is_empty());
        assert_eq!(e.context_menu(), None);
        assert!(!e.handle_key(EditorKey::Escape, false), "nothing left to clear");
    }
}
