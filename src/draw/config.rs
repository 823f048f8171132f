/// RGBA color tuple (red, green, blue, alpha) with values in 0.0..=1.0.
pub type Rgba = (f32, f32, f32, f32);

/// Window, colors and controls of the interactive viewer.
pub struct DrawConfig {
    pub title: String,
    pub background: Rgba,

    // Massing
    pub target_color: Rgba,
    pub neighbor_color: Rgba,
    pub ground_color: Rgba,
    pub roughness: f32,

    // Lighting
    pub ambient_intensity: f32,
    pub shadow_map_size: u32,

    // Controls
    /// Hours added or removed per arrow key press.
    pub hour_step: f64,
}

impl DrawConfig {
    pub fn new() -> Self {
        Self {
            title: "massing3d".to_string(),
            background: (0.78, 0.88, 0.96, 1.0),

            target_color: (0.92, 0.47, 0.24, 1.0),
            neighbor_color: (0.88, 0.88, 0.88, 1.0),
            ground_color: (0.75, 0.75, 0.7, 1.0),
            roughness: 0.8,

            ambient_intensity: 0.4,
            shadow_map_size: 2048,

            hour_step: 0.5,
        }
    }
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self::new()
    }
}
