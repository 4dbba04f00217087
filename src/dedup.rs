use anyhow::{bail, Result};
use log::info;

use crate::histogram::TileProfile;

// Links every region whose palette is contained in another region's palette to
// a representative. Backward scan first: each tile links to the lowest-index
// earlier tile whose palette is a superset of its own, resolved through that
// tile's own link so links point at representatives. Tiles still unlinked then
// get a forward scan against other unlinked tiles. Superset-of is a partial
// order, so scan direction and the ascending-index choice fix the result.
pub fn find_duplicates(tiles: &mut [TileProfile]) {
    info!("Searching for regions with shared palettes...");
    for i in 0..tiles.len() {
        let mut link = None;
        let mut identical = false;
        for j in 0..i {
            if tiles[j].palette.contains_all(&tiles[i].palette) {
                let root = tiles[j].duplicate.unwrap_or(j);
                identical = tiles[i].palette.contains_all(&tiles[root].palette);
                link = Some(root);
                break;
            }
        }
        tiles[i].duplicate = link;
        tiles[i].identical = identical;
    }
    for i in 0..tiles.len() {
        if tiles[i].duplicate.is_some() {
            continue;
        }
        for j in i + 1..tiles.len() {
            if tiles[j].duplicate.is_some() {
                continue;
            }
            if tiles[j].palette.contains_all(&tiles[i].palette) {
                tiles[i].duplicate = Some(j);
                tiles[i].identical = tiles[i].palette.contains_all(&tiles[j].palette);
                break;
            }
        }
    }
}

// Walks a tile's duplicate link to its representative. The hop bound turns a
// link cycle into an internal-consistency failure instead of a hang; the
// scans above never produce one.
pub fn resolve_root(tiles: &[TileProfile], mut index: usize) -> Result<usize> {
    let mut hops = 0;
    while let Some(target) = tiles[index].duplicate {
        if target == index || hops >= tiles.len() {
            bail!("duplicate-link cycle detected at region {}", index);
        }
        index = target;
        hops += 1;
    }
    Ok(index)
}

// Re-points every link directly at its root, so no link target is itself linked.
pub fn compress_links(tiles: &mut [TileProfile]) -> Result<()> {
    for i in 0..tiles.len() {
        if tiles[i].duplicate.is_some() {
            let root = resolve_root(tiles, i)?;
            tiles[i].duplicate = Some(root);
        }
    }
    Ok(())
}
