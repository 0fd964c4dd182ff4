//! Worker-groups editor: tune per-profile worker counts and save them back.
//!
//! No polling here; the document loads on show and reloads after saves. A
//! save can partially succeed: groups modified concurrently come back in the
//! `Outdated` list, get reported, and the reload shows what actually applied.
//! Local edits block background reloads until saved or undone.

use std::sync::Arc;

use crossterm::event::KeyCode;
use crossterm::style::Stylize;
use jobdeck_api::{ApiClient, SaveStatus, WorkerGroups, WorkerProfile};
use pagekit::{batch, Cmd, KeyMsg, Message, Page};

use crate::messages::{AlertMsg, GroupsLoadedMsg, GroupsSavedMsg, RefreshNudgeMsg};
use crate::pages::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditorState {
    Idle,
    Loading,
    Saving,
}

pub struct WorkerGroupsPage {
    api: Arc<ApiClient>,
    groups: Option<WorkerGroups>,
    selected: usize,
    state: EditorState,
    dirty: bool,
}

impl WorkerGroupsPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            groups: None,
            selected: 0,
            state: EditorState::Idle,
            dirty: false,
        }
    }

    pub(crate) fn prime(&mut self, groups: WorkerGroups) {
        self.groups = Some(groups);
        self.state = EditorState::Idle;
    }

    /// Selectable rows: every `(group, profile)` pair in document order.
    fn rows(&self) -> Vec<(String, String)> {
        let Some(groups) = &self.groups else {
            return Vec::new();
        };
        groups
            .iter()
            .flat_map(|(name, group)| {
                group
                    .profiles
                    .keys()
                    .map(move |profile| (name.clone(), profile.clone()))
            })
            .collect()
    }

    fn fetch_cmd(&mut self) -> Cmd {
        self.state = EditorState::Loading;
        let api = Arc::clone(&self.api);
        Cmd::new(async move {
            let outcome = api.worker_groups().await.map_err(|e| e.to_string());
            Some(Message::new(GroupsLoadedMsg { outcome }))
        })
    }

    fn save_cmd(&mut self) -> Option<Cmd> {
        if !self.dirty || self.state == EditorState::Saving {
            return None;
        }
        let doc = self.groups.clone()?;
        self.state = EditorState::Saving;
        let api = Arc::clone(&self.api);
        Some(Cmd::new(async move {
            let outcome = api.save_worker_groups(&doc).await.map_err(|e| e.to_string());
            Some(Message::new(GroupsSavedMsg { outcome }))
        }))
    }

    fn edit_selected(&mut self, f: impl FnOnce(&mut WorkerProfile)) {
        let rows = self.rows();
        let Some((group, profile)) = rows.get(self.selected) else {
            return;
        };
        let Some(profile) = self
            .groups
            .as_mut()
            .and_then(|g| g.get_mut(group))
            .and_then(|g| g.profiles.get_mut(profile))
        else {
            return;
        };
        let before = profile.clone();
        f(profile);
        if *profile != before {
            self.dirty = true;
        }
    }

    fn saved(&mut self, saved: &GroupsSavedMsg) -> Option<Cmd> {
        self.state = EditorState::Idle;
        match &saved.outcome {
            Ok(SaveStatus::Ok) => {
                self.dirty = false;
                Some(Cmd::from_msg(AlertMsg::success("worker groups saved")))
            }
            Ok(SaveStatus::Outdated(names)) => {
                // Partial success; the reload shows what actually applied.
                self.dirty = false;
                let alert = AlertMsg::warning(format!(
                    "saved, but outdated configs were skipped: {}",
                    names.join(", ")
                ));
                batch(vec![Some(Cmd::from_msg(alert)), Some(self.fetch_cmd())])
            }
            Ok(SaveStatus::Error(err)) => {
                Some(Cmd::from_msg(AlertMsg::error(format!("save failed: {err}"))))
            }
            Err(err) => Some(Cmd::from_msg(AlertMsg::error(format!("save failed: {err}")))),
        }
    }

    fn handle_key(&mut self, key: &KeyMsg) -> Option<Cmd> {
        let count = self.rows().len();
        match key.code() {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if count > 0 {
                    self.selected = (self.selected + 1).min(count - 1);
                }
                None
            }
            KeyCode::Char('+') => {
                self.edit_selected(|p| p.max_count += 1);
                None
            }
            KeyCode::Char('-') => {
                self.edit_selected(|p| p.max_count = p.max_count.saturating_sub(1).max(p.min_count));
                None
            }
            KeyCode::Char('>') => {
                self.edit_selected(|p| p.min_count = (p.min_count + 1).min(p.max_count));
                None
            }
            KeyCode::Char('<') => {
                self.edit_selected(|p| p.min_count = p.min_count.saturating_sub(1));
                None
            }
            KeyCode::Char('S') => self.save_cmd(),
            KeyCode::Char('u') => {
                // Undo: discard edits and reload the server copy.
                self.dirty = false;
                Some(self.fetch_cmd())
            }
            _ => None,
        }
    }
}

impl Page for WorkerGroupsPage {
    fn view(&self, width: u16, _height: u16) -> String {
        let mut out = format!("{}\n", "Worker groups".bold());
        let Some(groups) = &self.groups else {
            let line = match self.state {
                EditorState::Loading => "loading...",
                _ => "no worker groups",
            };
            out.push_str(line);
            out.push('\n');
            return out;
        };

        let mut index = 0usize;
        for (name, group) in groups {
            out.push_str(&format!(
                "{} (terminate after {}s)\n",
                name.clone().bold(),
                group.process_termination_timeout
            ));
            for (profile_name, profile) in &group.profiles {
                let line = format!(
                    "  {:<16} min {:>3}  max {:>3}  mem {:>6}  cpu {:>6}  {}",
                    profile_name,
                    profile.min_count,
                    profile.max_count,
                    profile.memory,
                    profile.cpu,
                    util::clip(&profile.command, usize::from(width).saturating_sub(60).max(10)),
                );
                if index == self.selected {
                    out.push_str(&format!("{}\n", line.reverse()));
                } else {
                    out.push_str(&format!("{line}\n"));
                }
                index += 1;
            }
        }

        let status = match self.state {
            EditorState::Loading => "loading...",
            EditorState::Saving => "saving...",
            EditorState::Idle if self.dirty => "modified, S saves",
            EditorState::Idle => "in sync",
        };
        out.push_str(&format!("\n{status}\n"));
        out.push_str(&format!(
            "{}",
            "+/-: max workers   </>: min workers   S: save   u: undo edits".dim()
        ));
        out
    }

    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
            return self.handle_key(key);
        }
        if let Some(loaded) = msg.downcast_ref::<GroupsLoadedMsg>() {
            self.state = EditorState::Idle;
            match &loaded.outcome {
                Ok(groups) => {
                    self.groups = Some(groups.clone());
                    let count = self.rows().len();
                    self.selected = self.selected.min(count.saturating_sub(1));
                    return None;
                }
                Err(err) => {
                    return Some(Cmd::from_msg(AlertMsg::error(format!(
                        "worker groups load failed: {err}"
                    ))));
                }
            }
        }
        if let Some(saved) = msg.downcast_ref::<GroupsSavedMsg>() {
            return self.saved(saved);
        }
        if msg.is::<RefreshNudgeMsg>() {
            // Unsaved edits win over a background reload.
            if self.dirty || self.state != EditorState::Idle {
                return None;
            }
            return Some(self.fetch_cmd());
        }
        None
    }

    fn on_show(&mut self) -> Option<Cmd> {
        if self.dirty {
            return None;
        }
        Some(self.fetch_cmd())
    }
}
