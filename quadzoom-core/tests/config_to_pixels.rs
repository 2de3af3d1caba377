//! From a JSON configuration to shaded pixels of the root tile.

use quadzoom_core::{
    gradient_ramp, render_tile, shade, BackendKind, ConfigError, RenderConfig, Viewport,
};

const CONFIG: &str = r#"{
    "texture_resolution": 32,
    "max_iterations": 100,
    "cutoff": 99,
    "background": [10, 20, 30],
    "backend": "cpu"
}"#;

#[test]
fn partial_json_fills_defaults() {
    let config = RenderConfig::from_json(CONFIG).unwrap();
    assert_eq!(config.texture_resolution, 32);
    assert_eq!(config.backend, BackendKind::Cpu);
    assert_eq!(config.split_threshold, 0.5);
    assert_eq!(config.color_period, 32.0);
    assert_eq!(config.root_bounds().max_iterations, 100.0);
    assert_eq!(config.root_bounds().left, -2.0);
}

#[test]
fn invalid_values_are_rejected() {
    let err = RenderConfig::from_json(r#"{ "texture_resolution": 0 }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = RenderConfig::from_json(r#"{ "backend": "fpga" }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn root_tile_shades_interior_as_background() {
    let config = RenderConfig::from_json(CONFIG).unwrap();
    let viewport = Viewport::from_config(&config, (800, 800));
    assert_eq!(viewport.visible_bounds().left, config.initial_bounds.left);
    assert_eq!(viewport.visible_bounds().right, config.initial_bounds.right);

    let res = config.texture_resolution;
    let values = render_tile(&config.root_bounds(), res);
    let ramp = gradient_ramp();
    let shaded: Vec<[u8; 3]> = values
        .iter()
        .map(|&v| shade(v, viewport.cutoff(), config.color_period, &ramp, config.background))
        .collect();

    // Texel (16, 16) samples the origin, which never escapes
    let centre = (16 * res + 16) as usize;
    assert_eq!(values[centre], 100.0);
    assert_eq!(shaded[centre], config.background);

    // The corner escapes at once and takes a ramp colour
    assert!(values[0] < 99.0);
    assert_ne!(shaded[0], config.background);
}
