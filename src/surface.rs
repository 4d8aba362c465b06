use bevy::math::{Rect, Vec2};

/// Something the matrix can paint glyphs onto.
///
/// Coordinates are logical (DPI independent), with the origin in the top-left corner and y
/// growing downwards.
pub trait Surface {
    /// current logical size of the surface
    fn logical_size(&self) -> Vec2;

    fn clear(&mut self, region: Rect);

    /// sets the alpha used by every following `draw_text` call
    fn set_alpha(&mut self, alpha: f32);

    fn draw_text(&mut self, glyph: char, position: Vec2);
}

/// Re-arms the frame loop.
pub trait FrameScheduler {
    fn schedule_next_frame(&mut self);
}
