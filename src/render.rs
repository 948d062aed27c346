use crate::types::{Group, WidthWindow};

const MAX_COLUMNS: f64 = 80.0;
const ROWS: usize = 3;

/// Draws a group as a row of cells scaled to `window.max`, with `^` marks
/// under the minimum and maximum width, followed by a one-line caption.
pub fn render_group(group: &Group, window: WidthWindow) -> String {
    if window.max == 0 {
        return String::new();
    }
    let scale = MAX_COLUMNS / window.max as f64;
    let cols = (window.max as f64 * scale).round() as usize;

    let mut grid = vec![vec![' '; cols + 1]; ROWS + 1];

    let mut offset = 0u64;
    for item in &group.items {
        let x0 = (offset as f64 * scale).round() as usize;
        offset += item.width as u64;
        let x1 = (offset as f64 * scale).round() as usize;
        if x1 <= x0 {
            continue;
        }
        draw_cell(&mut grid, x0, x1);

        let label: Vec<char> = format!("#{}", item.piece_id).chars().collect();
        if x1 - x0 > label.len() {
            let start = x0 + (x1 - x0 - label.len() + 1) / 2;
            for (i, &ch) in label.iter().enumerate() {
                let x = start + i;
                if x > x0 && x < x1 && x < cols + 1 {
                    grid[1][x] = ch;
                }
            }
        }
    }

    let min_x = (window.min as f64 * scale).round() as usize;
    grid[ROWS][min_x.min(cols)] = '^';
    grid[ROWS][cols] = '^';

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result.push_str(&format!(
        "width {} of {}, qty {}, spread {}\n",
        group.total_width(),
        window,
        group.total_qty(),
        group.length_spread()
    ));
    result
}

/// Box spanning columns `x0..=x1` over the three cell rows. Shared edges
/// between neighbours become `+` where lines cross.
#[allow(clippy::needless_range_loop)]
fn draw_cell(grid: &mut [Vec<char>], x0: usize, x1: usize) {
    let cols = grid[0].len();
    let bottom = ROWS - 1;

    for x in x0..=x1.min(cols - 1) {
        for y in [0, bottom] {
            grid[y][x] = if grid[y][x] == '|' || grid[y][x] == '+' {
                '+'
            } else {
                '-'
            };
        }
    }

    for y in 0..=bottom {
        for x in [x0, x1] {
            if x < cols {
                grid[y][x] = if grid[y][x] == '-' || grid[y][x] == '+' {
                    '+'
                } else {
                    '|'
                };
            }
        }
    }
}
