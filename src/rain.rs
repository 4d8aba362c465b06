#![allow(clippy::type_complexity)]

use bevy::{
    math::{vec2, vec3},
    prelude::*,
    window::PrimaryWindow,
};

use crate::{
    config::BitMatrixConfig,
    matrix::BitMatrix,
    state::RainState,
    surface::{FrameScheduler, Surface},
};

/// Runs a [`BitMatrix`] on the primary window.
pub struct RainPlugin {
    pub config: BitMatrixConfig,
    /// stop after this many frames
    pub frame_limit: Option<u64>,
}

impl Plugin for RainPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .insert_resource(BitMatrix::new(self.config.clone()))
            .insert_resource(FrameLimit(self.frame_limit))
            .insert_resource(Time::<Fixed>::from_hz(self.config.fps))
            .init_resource::<FrameBuffer>()
            .init_resource::<GlyphPool>()
            .add_event::<StopRain>()
            .add_systems(
                OnEnter(RainState::Load),
                (load_glyph_style, build_matrix).chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    sync_surface_size,
                    render_frame,
                    present_frame,
                    enforce_frame_limit,
                )
                    .chain()
                    .run_if(in_state(RainState::Running)),
            )
            .add_systems(Update, handle_stop_requests)
            .add_systems(OnEnter(RainState::Stopped), exit_if_limited);
    }
}

// ——> SYSTEMS

fn load_glyph_style(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    config: Res<BitMatrixConfig>,
) {
    let font: Handle<Font> = match &config.text.font_family {
        Some(path) => asset_server.load(path.clone()),
        None => Handle::default(),
    };
    commands.insert_resource(GlyphStyle {
        font,
        font_size: config.text.font_size_px,
        color: config.text_color(),
    });
}

fn build_matrix(
    mut matrix: ResMut<BitMatrix>,
    mut frame: ResMut<FrameBuffer>,
    window: Query<&Window, With<PrimaryWindow>>,
    mut next_state: ResMut<NextState<RainState>>,
) {
    let size = window_size(&window);
    frame.size = size;
    matrix.build(size);
    next_state.set(RainState::Running);
}

/// picks up window resizes at the start of the tick, the matrix reconciles on its next frame
fn sync_surface_size(mut frame: ResMut<FrameBuffer>, window: Query<&Window, With<PrimaryWindow>>) {
    let size = window_size(&window);
    if frame.size != size {
        frame.size = size;
    }
}

fn render_frame(
    mut matrix: ResMut<BitMatrix>,
    mut frame: ResMut<FrameBuffer>,
    mut next_state: ResMut<NextState<RainState>>,
) {
    let mut next = NextFrame::default();
    matrix.render_frame(&mut *frame, &mut next);
    if !next.armed {
        next_state.set(RainState::Stopped);
    }
}

/// Mirrors the recorded draws onto a pool of text entities, spawning more when the matrix grows
/// and hiding the leftovers when it shrinks. A pool more than twice the frame is cut back.
fn present_frame(
    mut commands: Commands,
    frame: Res<FrameBuffer>,
    style: Res<GlyphStyle>,
    mut pool: ResMut<GlyphPool>,
    mut glyphs: Query<
        (
            &mut Text2d,
            &mut TextColor,
            &mut Transform,
            &mut Visibility,
        ),
        With<Glyph>,
    >,
) {
    let mut buf = [0u8; 4];
    for (i, draw) in frame.glyphs.iter().enumerate() {
        let glyph: &str = draw.glyph.encode_utf8(&mut buf);
        let translation = frame.to_world(draw.position);
        let color = style.color.with_alpha(draw.alpha);

        if let Some(&entity) = pool.0.get(i) {
            if let Ok((mut text, mut text_color, mut transform, mut visibility)) =
                glyphs.get_mut(entity)
            {
                if text.0 != glyph {
                    text.0 = glyph.to_string();
                }
                if transform.translation != translation {
                    transform.translation = translation;
                }
                text_color.0 = color;
                *visibility = Visibility::Inherited;
            }
        } else {
            let entity = commands
                .spawn((
                    Glyph,
                    Text2d::new(glyph),
                    TextFont {
                        font: style.font.clone(),
                        font_size: style.font_size,
                        ..default()
                    },
                    TextColor(color),
                    Transform::from_translation(translation),
                ))
                .id();
            pool.0.push(entity);
        }
    }

    let needed = frame.glyphs.len();
    if pool.0.len() > needed * 2 {
        for entity in pool.0.drain(needed..) {
            commands.entity(entity).despawn();
        }
    } else {
        for &entity in pool.0.iter().skip(needed) {
            if let Ok((_, _, _, mut visibility)) = glyphs.get_mut(entity) {
                *visibility = Visibility::Hidden;
            }
        }
    }
}

fn enforce_frame_limit(limit: Res<FrameLimit>, mut matrix: ResMut<BitMatrix>) {
    if let Some(max_frames) = limit.0 {
        if !matrix.is_stopped() && matrix.frame_count() >= max_frames {
            matrix.stop();
        }
    }
}

fn handle_stop_requests(mut events: EventReader<StopRain>, mut matrix: ResMut<BitMatrix>) {
    if events.read().count() > 0 {
        matrix.stop();
    }
}

fn exit_if_limited(limit: Res<FrameLimit>, mut exit: EventWriter<AppExit>) {
    if limit.0.is_some() {
        info!("frame limit reached, exiting");
        exit.send(AppExit::Success);
    }
}

fn window_size(window: &Query<&Window, With<PrimaryWindow>>) -> Vec2 {
    window
        .get_single()
        .map(|w| vec2(w.width(), w.height()))
        .unwrap_or(Vec2::ZERO)
}

// ——> EVENTS

/// Stops the matrix: the frame loop is not re-armed after the next tick.
#[derive(Event, Debug, Clone, Copy)]
pub struct StopRain;

// ——> COMPONENTS

#[derive(Component)]
struct Glyph;

// ——> RESOURCES

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphDraw {
    pub glyph: char,
    /// surface coordinates, origin top-left
    pub position: Vec2,
    pub alpha: f32,
}

/// [`Surface`] that records the draws of one frame for [`present_frame`].
#[derive(Resource, Debug, Default)]
pub struct FrameBuffer {
    size: Vec2,
    alpha: f32,
    glyphs: Vec<GlyphDraw>,
}

impl FrameBuffer {
    pub fn glyphs(&self) -> &[GlyphDraw] {
        &self.glyphs
    }

    /// converts surface coordinates to world coordinates (origin at the center, y up)
    #[inline]
    fn to_world(&self, position: Vec2) -> Vec3 {
        vec3(
            position.x - self.size.x * 0.5,
            self.size.y * 0.5 - position.y,
            0.0,
        )
    }
}

impl Surface for FrameBuffer {
    fn logical_size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self, _region: Rect) {
        // every frame redraws the whole matrix
        self.glyphs.clear();
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    fn draw_text(&mut self, glyph: char, position: Vec2) {
        self.glyphs.push(GlyphDraw {
            glyph,
            position,
            alpha: self.alpha,
        });
    }
}

#[derive(Resource, Default)]
struct GlyphPool(Vec<Entity>);

#[derive(Resource)]
struct GlyphStyle {
    font: Handle<Font>,
    font_size: f32,
    color: Color,
}

#[derive(Resource, Debug, Clone, Copy)]
struct FrameLimit(Option<u64>);

#[derive(Debug, Default)]
struct NextFrame {
    armed: bool,
}

impl FrameScheduler for NextFrame {
    fn schedule_next_frame(&mut self) {
        self.armed = true;
    }
}
