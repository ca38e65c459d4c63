use crate::kernel::Kernel;
use crate::panorama::{PanoramaSprite, PanoramaSpriteId, SurfaceId};
use crate::system::{
    AnimTarget, CelRes, CycleKind, CyclerId, ItemOwner, MoveKind, MoverId, Point, ScreenItem,
    ScreenItemId, ScriptId, ScriptTarget, SoundTrack, TrackId,
};

/// Which layer of the room graph owns a set of assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetScope {
    Room(u16),
    SubRoom { parent: u16, number: u16 },
    Global(u16),
}

impl AssetScope {
    /// Sub-room items are registered under their parent room.
    pub fn owner(self) -> ItemOwner {
        match self {
            AssetScope::Room(number) => ItemOwner::Room(number),
            AssetScope::SubRoom { parent, .. } => ItemOwner::Room(parent),
            AssetScope::Global(number) => ItemOwner::GlobalRoom(number),
        }
    }

    pub fn target(self, tag: u16) -> ScriptTarget {
        match self {
            AssetScope::Room(_) => ScriptTarget::Room(tag),
            AssetScope::SubRoom { .. } => ScriptTarget::SubRoom(tag),
            AssetScope::Global(_) => ScriptTarget::GlobalRoom(tag),
        }
    }
}

/// Everything a room registered with the kernel. `dispose` hands all of it
/// back, so nothing outlives the room that made it.
#[derive(Debug)]
pub struct RoomAssets {
    scope: AssetScope,
    items: Vec<ScreenItemId>,
    sprites: Vec<PanoramaSpriteId>,
    surfaces: Vec<SurfaceId>,
    scripts: Vec<ScriptId>,
    cyclers: Vec<CyclerId>,
    movers: Vec<MoverId>,
    tracks: Vec<TrackId>,
}

impl RoomAssets {
    pub fn new(scope: AssetScope) -> Self {
        Self {
            scope,
            items: Vec::new(),
            sprites: Vec::new(),
            surfaces: Vec::new(),
            scripts: Vec::new(),
            cyclers: Vec::new(),
            movers: Vec::new(),
            tracks: Vec::new(),
        }
    }

    pub fn scope(&self) -> AssetScope {
        self.scope
    }

    pub fn item(
        &mut self,
        kernel: &mut Kernel,
        cel: CelRes,
        position: Point,
        priority: i16,
    ) -> ScreenItemId {
        self.add_item(kernel, ScreenItem::new(self.scope.owner(), cel, position, priority))
    }

    pub fn add_item(&mut self, kernel: &mut Kernel, item: ScreenItem) -> ScreenItemId {
        let id = kernel.plane.add(item);
        self.items.push(id);
        id
    }

    pub fn remove_item(&mut self, kernel: &mut Kernel, id: ScreenItemId) {
        self.items.retain(|item| *item != id);
        kernel.plane.remove(id);
    }

    pub fn surface(&mut self, kernel: &mut Kernel, width: i16, height: i16, fill: u8) -> SurfaceId {
        let id = kernel.panorama.add_surface(width, height, fill);
        self.surfaces.push(id);
        id
    }

    /// Adds a sprite and draws it on `surface`.
    pub fn sprite(
        &mut self,
        kernel: &mut Kernel,
        sprite: PanoramaSprite,
        surface: SurfaceId,
    ) -> PanoramaSpriteId {
        let id = kernel.panorama.add_sprite(sprite);
        kernel.panorama.draw(id, surface);
        self.sprites.push(id);
        id
    }

    pub fn remove_sprite(&mut self, kernel: &mut Kernel, id: PanoramaSpriteId) {
        self.sprites.retain(|sprite| *sprite != id);
        kernel.panorama.remove_sprite(id);
    }

    pub fn script(&mut self, kernel: &mut Kernel, label: &str, tag: u16) -> ScriptId {
        let id = kernel.spawn_script(label, self.scope.target(tag));
        self.scripts.retain(|script| kernel.scripts.is_alive(*script));
        self.scripts.push(id);
        id
    }

    pub fn cycle(
        &mut self,
        kernel: &mut Kernel,
        kind: CycleKind,
        target: AnimTarget,
        caller: Option<ScriptId>,
    ) -> Option<CyclerId> {
        let id = kernel.start_cycler(kind, target, caller)?;
        self.cyclers.push(id);
        Some(id)
    }

    pub fn move_to(
        &mut self,
        kernel: &mut Kernel,
        kind: MoveKind,
        target: AnimTarget,
        destination: Point,
        caller: Option<ScriptId>,
    ) -> Option<MoverId> {
        let id = kernel.start_mover(kind, target, destination, caller)?;
        self.movers.push(id);
        Some(id)
    }

    pub fn track(&mut self, kernel: &mut Kernel, track: SoundTrack) -> TrackId {
        let id = kernel.add_track(track);
        self.tracks.push(id);
        id
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Releases animators first, then scripts, tracks and finally anything
    /// drawn.
    pub fn dispose(&mut self, kernel: &mut Kernel) {
        for id in self.cyclers.drain(..) {
            kernel.stop_cycler(id);
        }
        for id in self.movers.drain(..) {
            kernel.stop_mover(id);
        }
        for id in self.scripts.drain(..) {
            kernel.scripts.dispose(id);
        }
        for id in self.tracks.drain(..) {
            kernel.remove_track(id);
        }
        for id in self.sprites.drain(..) {
            kernel.panorama.remove_sprite(id);
        }
        for id in self.surfaces.drain(..) {
            kernel.panorama.remove_surface(id);
        }
        for id in self.items.drain(..) {
            kernel.plane.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::resource::ResourceManager;
    use crate::sound::RecordingMixer;

    #[test]
    fn dispose_releases_everything() {
        let mut kernel = Kernel::new(
            Arc::new(ResourceManager::new()),
            Box::new(RecordingMixer::new()),
            0,
        );
        let mut assets = RoomAssets::new(AssetScope::SubRoom {
            parent: 26000,
            number: 26100,
        });
        let item = assets.item(&mut kernel, CelRes::new(26100, 0, 0), Point::new(0, 0), 5);
        assert_eq!(
            kernel.plane.get(item).unwrap().owner,
            ItemOwner::Room(26000)
        );
        let surface = assets.surface(&mut kernel, 64, 16, 0);
        let sprite = assets.sprite(
            &mut kernel,
            PanoramaSprite::solid(26000, Point::new(4, 4), 4, 4, 3, 10),
            surface,
        );
        let script = assets.script(&mut kernel, "tape", 1);
        assert_eq!(kernel.scripts.target(script), Some(ScriptTarget::SubRoom(1)));
        assets.cycle(&mut kernel, CycleKind::Forward, AnimTarget::Panorama(sprite), None);
        assets.track(&mut kernel, SoundTrack::new());

        assets.dispose(&mut kernel);
        assert!(kernel.plane.is_empty());
        assert!(kernel.scripts.is_empty());
        assert!(kernel.cyclers.is_empty());
        assert!(kernel.tracks.is_empty());
        assert_eq!(kernel.panorama.sprite_count(), 0);
        assert_eq!(kernel.panorama.surface_count(), 0);
    }
}
