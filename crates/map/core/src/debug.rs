//! Text dump of a map region, used by tests and the replay tool.
//!
//! Each square renders as `[...]` with comma separated entries: `#` for
//! fog-of-war, `H<layer>=<name>` for a face anchored on the square and
//! `T<layer>=<name>` for a multi-tile face covering it from another square.
//! Every row ends with a newline.

use crate::config::MapConfig;
use crate::state::MapGrid;

pub fn render_region(grid: &MapGrid, x0: i32, y0: i32, width: u32, height: u32) -> String {
    let mut out = String::new();
    for y in y0..y0 + height as i32 {
        for x in x0..x0 + width as i32 {
            out.push('[');
            let mut entries = Vec::new();
            if grid.is_fog_of_war(x, y) {
                entries.push("#".to_owned());
            }
            for layer in 0..MapConfig::NUM_LAYERS {
                if let Some(face) = grid.face(x, y, layer) {
                    entries.push(format!("H{layer}={}", face.name));
                } else if let Some(head) = grid.head(x, y, layer) {
                    entries.push(format!("T{layer}={}", head.face.name));
                }
            }
            out.push_str(&entries.join(","));
            out.push(']');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::env::Face;
    use crate::state::FaceNum;

    #[test]
    fn renders_faces_tails_and_fog() {
        let mut grid = MapGrid::new();
        grid.reset(3, 2);
        let m = Arc::new(Face::new(FaceNum(1), "M", 2, 1));
        grid.set_face(1, 0, 6, Some(m));
        grid.set_darkness(2, 1, 10);
        grid.clear_square(2, 1);

        assert_eq!(render_region(&grid, 0, 0, 3, 2), "[T6=M][H6=M][]\n[][][#]\n");
    }
}
