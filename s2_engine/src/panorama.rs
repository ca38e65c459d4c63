//! Wraparound panorama backgrounds and the sprites composited onto them.
//!
//! Surfaces and sprites live in one arena pair. A drawn sprite remembers its
//! surface and the surface keeps the set of sprites drawn on it; neither side
//! owns the other, and both links are cut explicitly by `erase`.

use std::collections::BTreeSet;

use log::debug;

use crate::system::arena::{Arena, Id};
use crate::system::types::{Animated, Point};

pub type SurfaceId = Id<PanoramaSurface>;
pub type PanoramaSpriteId = Id<PanoramaSprite>;

/// Transparent sprite pixels carry this color.
pub const SKIP_COLOR: u8 = 255;

#[derive(Debug, Clone)]
pub struct PanoramaSurface {
    width: i16,
    height: i16,
    pixels: Vec<u8>,
    sprites: BTreeSet<PanoramaSpriteId>,
    pan_x: i16,
}

impl PanoramaSurface {
    pub fn width(&self) -> i16 {
        self.width
    }

    pub fn height(&self) -> i16 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: i16, y: i16) -> Option<u8> {
        if y < 0 || y >= self.height {
            return None;
        }
        let x = x.rem_euclid(self.width);
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn sprites(&self) -> &BTreeSet<PanoramaSpriteId> {
        &self.sprites
    }

    pub fn has_sprites(&self) -> bool {
        !self.sprites.is_empty()
    }

    pub fn pan_x(&self) -> i16 {
        self.pan_x
    }

    fn offset(&self, x: i16, y: i16) -> Option<usize> {
        if y < 0 || y >= self.height {
            return None;
        }
        let x = x.rem_euclid(self.width);
        Some(y as usize * self.width as usize + x as usize)
    }
}

#[derive(Debug, Clone)]
pub struct PanoramaSprite {
    pub resource: u16,
    position: Point,
    width: i16,
    height: i16,
    cels: Vec<Vec<u8>>,
    cel: i16,
    transparent: bool,
    visible: bool,
    saved: Vec<u8>,
    surface: Option<SurfaceId>,
    pub cycle_speed: u32,
    pub move_speed: u32,
    pub step_size: Point,
}

impl PanoramaSprite {
    /// `cels` holds one `width * height` bitmap per cel.
    pub fn new(
        resource: u16,
        position: Point,
        width: i16,
        height: i16,
        cels: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            resource,
            position,
            width,
            height,
            cels,
            cel: 0,
            transparent: false,
            visible: true,
            saved: Vec::new(),
            surface: None,
            cycle_speed: 6,
            move_speed: 6,
            step_size: Point::new(3, 2),
        }
    }

    /// Sprite whose cels are flat fills of `color`, `color + 1`, ...
    pub fn solid(
        resource: u16,
        position: Point,
        width: i16,
        height: i16,
        num_cels: i16,
        color: u8,
    ) -> Self {
        let area = width.max(0) as usize * height.max(0) as usize;
        let cels = (0..num_cels.max(1))
            .map(|cel| vec![color.wrapping_add(cel as u8); area])
            .collect();
        Self::new(resource, position, width, height, cels)
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    pub fn is_drawn(&self) -> bool {
        self.surface.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn num_cels(&self) -> i16 {
        self.cels.len() as i16
    }

    fn current_pixels(&self) -> Option<&[u8]> {
        self.cels.get(self.cel as usize).map(Vec::as_slice)
    }
}

impl Animated for PanoramaSprite {
    fn cel(&self) -> i16 {
        self.cel
    }

    fn set_cel(&mut self, cel: i16) {
        self.cel = cel.clamp(0, self.last_cel());
    }

    fn last_cel(&self) -> i16 {
        (self.cels.len() as i16 - 1).max(0)
    }

    fn cycle_speed(&self) -> u32 {
        self.cycle_speed
    }

    fn position(&self) -> Point {
        self.position
    }

    fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    fn move_speed(&self) -> u32 {
        self.move_speed
    }

    fn step_size(&self) -> Point {
        self.step_size
    }
}

#[derive(Debug, Default)]
pub struct Panorama {
    surfaces: Arena<PanoramaSurface>,
    sprites: Arena<PanoramaSprite>,
}

impl Panorama {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_surface(&mut self, width: i16, height: i16, fill: u8) -> SurfaceId {
        let width = width.max(1);
        let height = height.max(0);
        self.surfaces.insert(PanoramaSurface {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
            sprites: BTreeSet::new(),
            pan_x: 0,
        })
    }

    /// Erases every sprite still drawn on the surface, then frees it.
    pub fn remove_surface(&mut self, id: SurfaceId) -> bool {
        let Some(surface) = self.surfaces.get(id) else {
            return false;
        };
        let drawn: Vec<PanoramaSpriteId> = surface.sprites.iter().copied().collect();
        for sprite in drawn {
            self.erase(sprite);
        }
        self.surfaces.remove(id).is_some()
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&PanoramaSurface> {
        self.surfaces.get(id)
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Scrolls the view, wrapping around the surface width.
    pub fn pan_by(&mut self, id: SurfaceId, delta: i16) {
        if let Some(surface) = self.surfaces.get_mut(id) {
            let panned = surface.pan_x as i32 + delta as i32;
            surface.pan_x = panned.rem_euclid(surface.width as i32) as i16;
        }
    }

    pub fn add_sprite(&mut self, sprite: PanoramaSprite) -> PanoramaSpriteId {
        self.sprites.insert(sprite)
    }

    pub fn remove_sprite(&mut self, id: PanoramaSpriteId) -> Option<PanoramaSprite> {
        self.erase(id);
        self.sprites.remove(id)
    }

    pub fn sprite(&self, id: PanoramaSpriteId) -> Option<&PanoramaSprite> {
        self.sprites.get(id)
    }

    pub fn sprite_mut(&mut self, id: PanoramaSpriteId) -> Option<&mut PanoramaSprite> {
        self.sprites.get_mut(id)
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    /// Composites the sprite onto the surface, saving what it covers. A
    /// sprite already drawn elsewhere is erased from there first.
    pub fn draw(&mut self, sprite_id: PanoramaSpriteId, surface_id: SurfaceId) -> bool {
        if !self.surfaces.contains(surface_id) {
            return false;
        }
        let Some(current) = self.sprites.get(sprite_id).map(|sprite| sprite.surface) else {
            return false;
        };
        if current.is_some() {
            self.erase(sprite_id);
        }

        let (Some(sprite), Some(surface)) = (
            self.sprites.get_mut(sprite_id),
            self.surfaces.get_mut(surface_id),
        ) else {
            return false;
        };

        sprite.saved.clear();
        if sprite.visible {
            let pixels = sprite.cels.get(sprite.cel as usize).cloned().unwrap_or_default();
            for row in 0..sprite.height {
                for col in 0..sprite.width {
                    let Some(target) =
                        surface.offset(sprite.position.x + col, sprite.position.y + row)
                    else {
                        continue;
                    };
                    sprite.saved.push(surface.pixels[target]);
                    let source = row as usize * sprite.width as usize + col as usize;
                    let color = pixels.get(source).copied().unwrap_or(SKIP_COLOR);
                    if !(sprite.transparent && color == SKIP_COLOR) {
                        surface.pixels[target] = color;
                    }
                }
            }
        }

        sprite.surface = Some(surface_id);
        surface.sprites.insert(sprite_id);
        debug!(
            "panorama sprite {sprite_id} drawn at ({}, {})",
            sprite.position.x, sprite.position.y
        );
        true
    }

    /// Restores the pixels under the sprite and cuts both links.
    pub fn erase(&mut self, sprite_id: PanoramaSpriteId) -> bool {
        let Some(sprite) = self.sprites.get_mut(sprite_id) else {
            return false;
        };
        let Some(surface_id) = sprite.surface.take() else {
            return false;
        };
        let saved = std::mem::take(&mut sprite.saved);
        let Some(surface) = self.surfaces.get_mut(surface_id) else {
            return false;
        };

        let mut restore = saved.into_iter();
        'rows: for row in 0..sprite.height {
            for col in 0..sprite.width {
                let Some(target) = surface.offset(sprite.position.x + col, sprite.position.y + row)
                else {
                    continue;
                };
                let Some(pixel) = restore.next() else {
                    break 'rows;
                };
                surface.pixels[target] = pixel;
            }
        }
        surface.sprites.remove(&sprite_id);
        true
    }

    /// Redraws a sprite after its cel or position changed.
    pub fn update(&mut self, sprite_id: PanoramaSpriteId) -> bool {
        let Some(surface) = self.sprites.get(sprite_id).and_then(|sprite| sprite.surface) else {
            return false;
        };
        self.erase(sprite_id);
        self.draw(sprite_id, surface)
    }

    /// Current cel bitmap of a sprite.
    pub fn sprite_pixels(&self, sprite_id: PanoramaSpriteId) -> Option<&[u8]> {
        self.sprites.get(sprite_id)?.current_pixels()
    }
}
