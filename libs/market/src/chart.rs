use anyhow::{Error, ensure};
use charming::{
    Chart, ImageFormat, ImageRenderer,
    component::{Axis, Grid, Title},
    element::{AxisLabel, AxisType, ItemStyle, SplitLine, TextStyle},
    series::{Bar as BarSeries, Candlestick},
};

use crate::Bar;

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 700;

/// Candlestick renderer with a volume subplot underneath the price grid.
#[derive(Debug, Clone, Copy)]
pub struct CandleChart {
    width: u32,
    height: u32,
}

impl Default for CandleChart {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
        }
    }
}

impl CandleChart {
    pub fn render_png(&self, symbol: &str, bars: &[Bar]) -> Result<Vec<u8>, Error> {
        ensure!(!bars.is_empty(), "no bars to chart for {symbol}");

        let dates: Vec<String> = bars
            .iter()
            .map(|b| b.timestamp.format("%Y-%m-%d").to_string())
            .collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

        let last_close = bars[bars.len() - 1].close;

        let chart = Chart::new()
            .background_color("#0b0c17")
            .title(
                Title::new()
                    .text(format!("{} | ${:.2}", symbol.to_uppercase(), last_close))
                    .left("center")
                    .top("2%")
                    .text_style(TextStyle::new().color("#ffffff").font_size(14)),
            )
            .grid(Grid::new().left("8%").right("5%").top("8%").height("58%"))
            .grid(Grid::new().left("8%").right("5%").top("74%").height("18%"))
            .x_axis(
                Axis::new()
                    .type_(AxisType::Category)
                    .grid_index(0)
                    .data(dates.clone())
                    .axis_label(AxisLabel::new().show(false))
                    .split_line(
                        SplitLine::new()
                            .line_style(charming::element::LineStyle::new().color("#2d2f45")),
                    ),
            )
            .x_axis(
                Axis::new()
                    .type_(AxisType::Category)
                    .grid_index(1)
                    .data(dates)
                    .axis_label(AxisLabel::new().rotate(45).interval(4).color("#a0a0a0")),
            )
            .y_axis(
                Axis::new()
                    .type_(AxisType::Value)
                    .grid_index(0)
                    .scale(true)
                    .axis_label(AxisLabel::new().color("#a0a0a0"))
                    .split_line(
                        SplitLine::new()
                            .line_style(charming::element::LineStyle::new().color("#2d2f45")),
                    ),
            )
            .y_axis(
                Axis::new()
                    .type_(AxisType::Value)
                    .grid_index(1)
                    .axis_label(AxisLabel::new().color("#a0a0a0")),
            )
            .series(
                Candlestick::new()
                    .name("Price")
                    .data(candle_rows(bars)),
            )
            .series(
                BarSeries::new()
                    .name("Volume")
                    .x_axis_index(1)
                    .y_axis_index(1)
                    .item_style(ItemStyle::new().color("#4f5b93"))
                    .data(volumes),
            );

        let mut renderer = ImageRenderer::new(self.width, self.height);
        let png_bytes = renderer.render_format(ImageFormat::Png, &chart)?;
        Ok(png_bytes)
    }
}

// ECharts candlestick rows are [open, close, lowest, highest].
fn candle_rows(bars: &[Bar]) -> Vec<Vec<f64>> {
    bars.iter()
        .map(|b| vec![b.open, b.close, b.low, b.high])
        .collect()
}
