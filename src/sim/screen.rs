//! Screens, the level repository and the live-screen manager
//!
//! The repository holds 256 screen slots. Exactly one screen is live at a
//! time: a clone whose background and collision layers are shared read-only
//! with the repository, and whose active layer is owned and mutated during
//! play. Mutations only reach the repository through [`ScreenManager::delete_object`]
//! and [`ScreenManager::add_to_level_data`].

use std::rc::Rc;

use glam::IVec2;

use super::entity::Entity;
use super::random::ScreenRandom;
use crate::SimError;
use crate::consts::LEVEL_SCREENS;

/// One room with its three object layers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Screen {
    /// Render-only
    pub background: Rc<[Entity]>,
    /// Static obstacles; never updated
    pub collisions: Rc<[Entity]>,
    /// Stateful objects
    pub active: Vec<Entity>,
}

impl Screen {
    pub fn new(background: Vec<Entity>, collisions: Vec<Entity>, active: Vec<Entity>) -> Self {
        Self {
            background: Rc::from(background),
            collisions: Rc::from(collisions),
            active,
        }
    }

    /// Live copy: static layers shared, active layer owned
    pub fn shallow_clone(&self) -> Self {
        Self {
            background: Rc::clone(&self.background),
            collisions: Rc::clone(&self.collisions),
            active: self.active.clone(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.background.len() + self.collisions.len() + self.active.len()
    }
}

/// Fixed array of 256 screen slots (16×16 grid)
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    screens: Vec<Option<Screen>>,
}

impl Default for Level {
    fn default() -> Self {
        Self::new()
    }
}

impl Level {
    /// All slots empty
    pub fn new() -> Self {
        Self {
            screens: vec![None; LEVEL_SCREENS],
        }
    }

    pub fn set_screen(&mut self, index: usize, screen: Screen) -> Result<(), SimError> {
        let slot = self.screens.get_mut(index).ok_or(SimError::ScreenOutOfRange(index))?;
        *slot = Some(screen);
        Ok(())
    }

    pub fn screen(&self, index: usize) -> Result<Option<&Screen>, SimError> {
        self.screens
            .get(index)
            .map(Option::as_ref)
            .ok_or(SimError::ScreenOutOfRange(index))
    }

    fn screen_mut(&mut self, index: usize) -> Result<Option<&mut Screen>, SimError> {
        self.screens
            .get_mut(index)
            .map(Option::as_mut)
            .ok_or(SimError::ScreenOutOfRange(index))
    }

    /// First populated screen
    pub fn start(&self) -> Option<u8> {
        self.screens.iter().position(Option::is_some).map(|i| i as u8)
    }

    pub fn populated(&self) -> usize {
        self.screens.iter().filter(|s| s.is_some()).count()
    }

    /// Populated screens with their indices
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Screen)> {
        self.screens
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i as u8, s)))
    }
}

/// Owns the repository and the single live screen
#[derive(Debug, Clone)]
pub struct ScreenManager {
    /// Unmodified level as delivered by the loader
    source: Level,
    /// Repository with persisted mutations
    level: Level,
    current: u8,
    live: Option<Screen>,
    /// Entities spawned mid-tick, admitted at the start of the next tick
    pending: Vec<Entity>,
    random: ScreenRandom,
    /// Collected items (screen, repository position), re-applied on reset
    collected: Vec<(u8, IVec2)>,
    /// Bumped on every activation
    generation: u64,
}

impl ScreenManager {
    /// Take ownership of a freshly loaded level; nothing is live yet
    pub fn new(level: Level) -> Self {
        Self {
            source: level.clone(),
            level,
            current: 0,
            live: None,
            pending: Vec::new(),
            random: ScreenRandom::default(),
            collected: Vec::new(),
            generation: 0,
        }
    }

    pub fn current_index(&self) -> u8 {
        self.current
    }

    /// Live screen, `None` for an absent room
    pub fn live(&self) -> Option<&Screen> {
        self.live.as_ref()
    }

    pub fn live_mut(&mut self) -> Option<&mut Screen> {
        self.live.as_mut()
    }

    pub fn random(&self) -> &ScreenRandom {
        &self.random
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn pending(&self) -> &[Entity] {
        &self.pending
    }

    pub fn collected(&self) -> &[(u8, IVec2)] {
        &self.collected
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Make screen `n` live
    pub fn change_screen(&mut self, n: usize) -> Result<(), SimError> {
        if n >= LEVEL_SCREENS {
            return Err(SimError::ScreenOutOfRange(n));
        }
        self.activate(n as u8);
        Ok(())
    }

    /// Reseed the jitter table and replace the live screen with a clone of
    /// repository slot `index`
    fn activate(&mut self, index: u8) {
        self.current = index;
        self.random = ScreenRandom::for_screen(index);
        self.pending.clear();
        self.generation += 1;
        self.live = self.level.screens[index as usize]
            .as_ref()
            .map(Screen::shallow_clone);
        match &self.live {
            Some(screen) => log::info!(
                "Screen {} live: {} background, {} collisions, {} active",
                index,
                screen.background.len(),
                screen.collisions.len(),
                screen.active.len()
            ),
            None => log::info!("Screen {} live: absent room", index),
        }
    }

    /// Remove the first repository object at `position` so it stays gone on
    /// the next visit. Returns whether an object was removed.
    pub fn delete_object(
        &mut self,
        screen_index: usize,
        position: IVec2,
    ) -> Result<bool, SimError> {
        let Some(screen) = self.level.screen_mut(screen_index)? else {
            log::debug!("Delete at {:?}: screen {} is empty", position, screen_index);
            return Ok(false);
        };
        match screen.active.iter().position(|e| e.origin == position) {
            Some(i) => {
                screen.active.remove(i);
                Ok(true)
            }
            None => {
                log::debug!("Delete at {:?}: no object on screen {}", position, screen_index);
                Ok(false)
            }
        }
    }

    /// Append a new object to the repository so it survives screen rebuilds
    pub fn add_to_level_data(
        &mut self,
        screen_index: usize,
        entity: Entity,
    ) -> Result<(), SimError> {
        let screen = self
            .level
            .screen_mut(screen_index)?
            .ok_or(SimError::EmptyScreen(screen_index))?;
        screen.active.push(entity);
        Ok(())
    }

    /// Stage a spawned entity; it joins the live active list next tick
    pub fn add_active(&mut self, entity: Entity) {
        self.pending.push(entity);
    }

    /// Move every staged entity into the live active list
    pub fn admit_pending_active(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        match self.live.as_mut() {
            Some(screen) => screen.active.append(&mut self.pending),
            None => {
                log::debug!("Dropping {} staged entities: no live screen", self.pending.len());
                self.pending.clear();
            }
        }
    }

    /// Remember a collected item and delete it from the repository
    pub fn record_collected(&mut self, screen_index: u8, position: IVec2) -> Result<(), SimError> {
        self.collected.push((screen_index, position));
        self.delete_object(screen_index as usize, position)?;
        Ok(())
    }

    /// Rebuild the repository from the source level, keep collected items
    /// gone, and re-activate the current screen
    pub fn reset_level(&mut self) -> Result<(), SimError> {
        self.level = self.source.clone();
        for (screen_index, position) in self.collected.clone() {
            self.delete_object(screen_index as usize, position)?;
        }
        log::info!(
            "Level reset: {} collected items kept removed",
            self.collected.len()
        );
        self.activate(self.current);
        Ok(())
    }
}
