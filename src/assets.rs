//! Reference images loaded once at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};
use tracing::info;

use crate::error::{BotError, Result};
use crate::game::boost::Boost;
use crate::layout::VariantLayout;
use crate::vision::{to_gray, ColorClassifier};

/// Named grayscale templates for the called-ball checks.
#[derive(Clone, Debug, Default)]
pub struct Templates {
    images: HashMap<&'static str, GrayImage>,
}

impl Templates {
    pub fn insert(&mut self, name: &'static str, image: GrayImage) {
        self.images.insert(name, image);
    }

    pub fn get(&self, name: &str) -> Option<&GrayImage> {
        self.images.get(name)
    }
}

pub struct AssetSet<B: Boost> {
    pub boosts: ColorClassifier<B>,
    pub game_over: DynamicImage,
    pub game_start: DynamicImage,
    pub templates: Templates,
}

fn load(path: PathBuf) -> Result<DynamicImage> {
    image::open(&path).map_err(|source| BotError::Asset { path, source })
}

/// First existing file among `names` in `dir`, or the first name if none exist.
fn first_existing(dir: &Path, names: &[&str]) -> PathBuf {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
        .unwrap_or_else(|| dir.join(names[0]))
}

impl<B: Boost> AssetSet<B> {
    /// Loads every reference the variant needs from `dir`.
    ///
    /// Layout: `powerups/<boost>.png`, `gameover.png`, a game start
    /// reference, and one `<template>.png` per called-ball template.
    pub fn load(dir: &Path, layout: &VariantLayout) -> Result<Self> {
        let mut boost_images = Vec::with_capacity(B::CHECK_ORDER.len());
        for &boost in B::CHECK_ORDER {
            let path = dir.join("powerups").join(format!("{}.png", boost.asset_name()));
            boost_images.push((boost, load(path)?));
        }
        let boosts = ColorClassifier::new(boost_images.iter().map(|(b, img)| (*b, img)));

        let game_over = load(dir.join("gameover.png"))?;
        let game_start = load(first_existing(
            dir,
            &["game_start.png", "updated_game_start.jpg", "game_start.jpg"],
        ))?;

        let mut templates = Templates::default();
        let names = layout
            .called
            .blank_templates
            .iter()
            .chain(layout.called.shifted.iter().map(|s| &s.blank))
            .map(|probe| probe.asset);
        for name in names {
            let image = load(dir.join(format!("{}.png", name)))?;
            templates.insert(name, to_gray(&image));
        }

        info!("Loaded {} assets from {}", layout.name, dir.display());
        Ok(Self { boosts, game_over, game_start, templates })
    }
}
