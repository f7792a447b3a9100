use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use engine::{EntityHandle, EntityPlacement, EntityWorld, Vec2, WorldSignal};
use tracing::{debug, info};

const PATROL_HALF_RANGE_PX: f32 = 24.0;
const PATROL_SPEED_PX: f32 = 0.5;
const CONTACT_HALF_WIDTH_PX: f32 = 12.0;
const CONTACT_HALF_HEIGHT_PX: f32 = 16.0;
const CONTACT_DAMAGE: f32 = 4.0;
const HURT_COOLDOWN_TICKS: u32 = 30;

/// Damage the world has dealt to the player since the player last looked.
pub(crate) type DamageInbox = Rc<Cell<f32>>;

#[derive(Debug, Clone)]
struct DemoEntity {
    screen: String,
    name: String,
    origin: Vec2,
    position: Vec2,
    boss: bool,
    heading: f32,
}

/// Patrolling enemies that hurt on contact, and bosses that fall when touched.
pub(crate) struct DemoWorld {
    entities: BTreeMap<EntityHandle, DemoEntity>,
    next_handle: u32,
    hurt_cooldown: u32,
    damage: DamageInbox,
}

impl DemoWorld {
    pub(crate) fn new(damage: DamageInbox) -> Self {
        Self {
            entities: BTreeMap::new(),
            next_handle: 0,
            hurt_cooldown: 0,
            damage,
        }
    }

    #[cfg(test)]
    fn live_count(&self) -> usize {
        self.entities.len()
    }
}

impl EntityWorld for DemoWorld {
    fn spawn(&mut self, screen: &str, placement: &EntityPlacement) -> EntityHandle {
        self.next_handle = self.next_handle.wrapping_add(1);
        let handle = EntityHandle(self.next_handle);
        let origin = placement.position.to_vec2();
        self.entities.insert(
            handle,
            DemoEntity {
                screen: screen.to_string(),
                name: placement.name.clone(),
                origin,
                position: origin,
                boss: placement.boss,
                heading: 1.0,
            },
        );
        debug!(screen, name = %placement.name, boss = placement.boss, "entity_spawned");
        handle
    }

    fn remove(&mut self, handle: EntityHandle) {
        self.entities.remove(&handle);
    }

    fn stop_all(&mut self) {
        if !self.entities.is_empty() {
            debug!(count = self.entities.len(), "entities_cleared");
        }
        self.entities.clear();
        self.hurt_cooldown = 0;
    }

    fn update(&mut self, screen: &str, player: Vec2) -> Vec<WorldSignal> {
        self.hurt_cooldown = self.hurt_cooldown.saturating_sub(1);
        let mut signals = Vec::new();
        let mut defeated = Vec::new();

        for (handle, entity) in self.entities.iter_mut().filter(|(_, e)| e.screen == screen) {
            if !entity.boss {
                entity.position.x += entity.heading * PATROL_SPEED_PX;
                if (entity.position.x - entity.origin.x).abs() >= PATROL_HALF_RANGE_PX {
                    entity.heading = -entity.heading;
                }
            }

            let touching = (entity.position.x - player.x).abs() < CONTACT_HALF_WIDTH_PX
                && (entity.position.y - player.y).abs() < CONTACT_HALF_HEIGHT_PX;
            if !touching {
                continue;
            }
            if entity.boss {
                info!(name = %entity.name, screen, "boss_defeated");
                defeated.push(*handle);
                signals.push(WorldSignal::BossDefeated);
            } else if self.hurt_cooldown == 0 {
                self.damage.set(self.damage.get() + CONTACT_DAMAGE);
                self.hurt_cooldown = HURT_COOLDOWN_TICKS;
                debug!(name = %entity.name, "player_hurt");
            }
        }

        for handle in defeated {
            self.entities.remove(&handle);
        }
        signals
    }

    fn position(&self, handle: EntityHandle) -> Option<Vec2> {
        self.entities.get(&handle).map(|entity| entity.position)
    }
}
