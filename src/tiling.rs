//! Quilt tiling: how many views pack into the quilt texture and at what
//! per-tile resolution. Everything here is pure arithmetic so the packing is
//! bit-reproducible for a given configuration.

pub const TILES_MIN: u32 = 1;
pub const TILES_MAX: u32 = 16;
pub const QUILT_SIZE_MIN: u32 = 512;
pub const QUILT_SIZE_MAX: u32 = 4096;

/// The (tilesX, tilesY, quiltSize) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tiling {
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub quilt_size: u32,
}

impl Tiling {
    /// Build a tiling, clamping each component to its supported range.
    pub fn new(tiles_x: u32, tiles_y: u32, quilt_size: u32) -> Self {
        Self {
            tiles_x: tiles_x.clamp(TILES_MIN, TILES_MAX),
            tiles_y: tiles_y.clamp(TILES_MIN, TILES_MAX),
            quilt_size: quilt_size.clamp(QUILT_SIZE_MIN, QUILT_SIZE_MAX),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingPreset {
    pub name: &'static str,
    pub tiling: Tiling,
}

/// Fixed, ordered preset list. The first entry is also the fallback whenever
/// a serialized tag fails to parse, and the forced preset for screenshots.
pub const PRESETS: [TilingPreset; 4] = [
    TilingPreset {
        name: "Standard",
        tiling: Tiling {
            tiles_x: 4,
            tiles_y: 8,
            quilt_size: 2048,
        },
    },
    TilingPreset {
        name: "High Res",
        tiling: Tiling {
            tiles_x: 5,
            tiles_y: 9,
            quilt_size: 4096,
        },
    },
    TilingPreset {
        name: "High View",
        tiling: Tiling {
            tiles_x: 6,
            tiles_y: 10,
            quilt_size: 4096,
        },
    },
    TilingPreset {
        name: "2D",
        tiling: Tiling {
            tiles_x: 1,
            tiles_y: 1,
            quilt_size: 1024,
        },
    },
];

/// Preset selection by index; any index past the preset list means "custom"
/// and yields the explicitly configured tiling instead.
pub fn select_tiling(preset_index: usize, custom: Tiling) -> Tiling {
    PRESETS
        .get(preset_index)
        .map(|p| p.tiling)
        .unwrap_or(custom)
}

/// Packing geometry derived from a [`Tiling`]. Recomputed whenever the
/// tiling changes, immutable in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuiltLayout {
    pub num_views: u32,
    pub tile_size_x: u32,
    pub tile_size_y: u32,
    pub padding_x: u32,
    pub padding_y: u32,
    pub portion_x: f32,
    pub portion_y: f32,
}

impl QuiltLayout {
    pub fn new(tiling: Tiling) -> Self {
        let tile_size_x = tiling.quilt_size / tiling.tiles_x;
        let tile_size_y = tiling.quilt_size / tiling.tiles_y;
        let padding_x = tiling.quilt_size - tiling.tiles_x * tile_size_x;
        let padding_y = tiling.quilt_size - tiling.tiles_y * tile_size_y;
        Self {
            num_views: tiling.tiles_x * tiling.tiles_y,
            tile_size_x,
            tile_size_y,
            padding_x,
            padding_y,
            portion_x: (tiling.tiles_x * tile_size_x) as f32 / tiling.quilt_size as f32,
            portion_y: (tiling.tiles_y * tile_size_y) as f32 / tiling.quilt_size as f32,
        }
    }
}

/// Pixel rectangle of one tile inside the quilt texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Destination rectangle for a view index. Rows are packed from the reversed
/// view index, and the y padding lands on the origin side only, because the
/// interleaving shader reads rows from the opposite edge.
pub fn tile_rect(view: u32, tiling: Tiling, layout: &QuiltLayout) -> TileRect {
    let reversed = layout.num_views - view - 1;
    let column = view % tiling.tiles_x;
    let row = reversed / tiling.tiles_x;
    TileRect {
        x: column * layout.tile_size_x,
        y: row * layout.tile_size_y + layout.padding_y,
        width: layout.tile_size_x,
        height: layout.tile_size_y,
    }
}

/// Horizontal angle for a view, in degrees. Views are spread evenly across
/// the cone from -cone/2 to +cone/2 inclusive; a single view is never offset.
pub fn angle_at_view(view: u32, num_views: u32, view_cone_deg: f32) -> f32 {
    if num_views <= 1 {
        return 0.0;
    }
    -view_cone_deg * 0.5 + view as f32 / (num_views - 1) as f32 * view_cone_deg
}

/// Fixed-width tag encoding of a tiling, e.g. 4x8 at 2048 -> `tx04ty08ts2048`.
pub fn serialize_tag(tiling: Tiling) -> String {
    format!(
        "tx{:02}ty{:02}ts{:04}",
        tiling.tiles_x, tiling.tiles_y, tiling.quilt_size
    )
}

/// Parse a tiling tag. Falls back to the first preset when any of the
/// `tx`/`ty`/`ts` markers is missing or malformed.
pub fn parse_tag(tag: &str) -> Tiling {
    parse_tag_fields(tag).unwrap_or(PRESETS[0].tiling)
}

fn parse_tag_fields(tag: &str) -> Option<Tiling> {
    let tiles_x = fixed_width_field(tag, "tx", 2)?;
    let tiles_y = fixed_width_field(tag, "ty", 2)?;
    let quilt_size = fixed_width_field(tag, "ts", 4)?;
    Some(Tiling::new(tiles_x, tiles_y, quilt_size))
}

fn fixed_width_field(tag: &str, marker: &str, width: usize) -> Option<u32> {
    let at = tag.find(marker)?;
    let start = at + marker.len();
    tag.get(start..start + width)?.parse().ok()
}
