//! Unsafe resolution/density combinations
//!
//! A fixed table of (density, resolution) pairs empirically known to break
//! the display pipeline. The bands have no derivable formula; they are
//! reproduced verbatim from field reports. "reset" requests resolve
//! against the current live metrics before matching.

/// Current-density bound that makes a "reset" density request match a rule
#[derive(Debug, Clone, Copy)]
enum DpiBound {
    AtLeast(u32),
    AtMost(u32),
}

/// Current-metric bound that makes a "reset" resolution request match a
/// rule; dimensions are (long axis, short axis)
#[derive(Debug, Clone, Copy)]
enum ResBound {
    AtMost(u32, u32),
    AtLeast(u32, u32),
}

struct Rule {
    dpi_reset: DpiBound,
    dpi_exact: &'static [&'static str],
    res_reset: ResBound,
    /// Forbidden resolutions as (long, short) pairs; rendered as
    /// "LONGxSHORT" in landscape and "SHORTxLONG" in portrait
    res_exact: &'static [(u32, u32)],
}

const RULES: &[Rule] = &[
    Rule {
        dpi_reset: DpiBound::AtLeast(480),
        dpi_exact: &["480", "560", "640"],
        res_reset: ResBound::AtMost(1280, 800),
        res_exact: &[
            (1280, 800),
            (1280, 768),
            (1280, 720),
            (1024, 768),
            (960, 600),
            (854, 480),
            (800, 600),
            (800, 480),
        ],
    },
    Rule {
        dpi_reset: DpiBound::AtLeast(320),
        dpi_exact: &["320", "400", "480", "560", "640"],
        res_reset: ResBound::AtMost(960, 600),
        res_exact: &[(960, 600), (854, 480), (800, 600), (800, 480)],
    },
    Rule {
        dpi_reset: DpiBound::AtMost(160),
        dpi_exact: &["120", "160"],
        res_reset: ResBound::AtLeast(2560, 1440),
        res_exact: &[(2560, 1440), (2560, 1600)],
    },
    Rule {
        dpi_reset: DpiBound::AtMost(120),
        dpi_exact: &["120"],
        res_reset: ResBound::AtLeast(1920, 1080),
        res_exact: &[
            (1920, 1080),
            (1920, 1200),
            (2048, 1536),
            (2560, 1440),
            (2560, 1600),
        ],
    },
];

fn render(long: u32, short: u32, landscape: bool) -> String {
    if landscape {
        format!("{long}x{short}")
    } else {
        format!("{short}x{long}")
    }
}

/// Decide whether applying the requested resolution/density pair is known
/// to be unsafe given the current live metrics and orientation.
pub fn is_unsafe(
    requested_res: &str,
    requested_dpi: &str,
    current_height: u32,
    current_width: u32,
    current_dpi: u32,
    landscape: bool,
) -> bool {
    // The long display axis is the width in landscape, the height in portrait
    let (cur_long, cur_short) = if landscape {
        (current_width, current_height)
    } else {
        (current_height, current_width)
    };

    RULES.iter().any(|rule| {
        let dpi_hit = if requested_dpi == "reset" {
            match rule.dpi_reset {
                DpiBound::AtLeast(floor) => current_dpi >= floor,
                DpiBound::AtMost(ceil) => current_dpi <= ceil,
            }
        } else {
            rule.dpi_exact.contains(&requested_dpi)
        };
        if !dpi_hit {
            return false;
        }

        if requested_res == "reset" {
            match rule.res_reset {
                ResBound::AtMost(long, short) => cur_long <= long && cur_short <= short,
                ResBound::AtLeast(long, short) => cur_long >= long && cur_short >= short,
            }
        } else {
            rule.res_exact
                .iter()
                .any(|&(long, short)| render(long, short, landscape) == requested_res)
        }
    })
}
