//! Report generation tools
//!
//! Weekly menu PDF: the meal texts of each day, per-day nutrition, an
//! energy-by-day chart and the allergy warnings for the week.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{Datelike, NaiveDate, Weekday};
use printpdf::*;
use printpdf::image_crate::{DynamicImage, RgbImage, ImageFormat};
use serde::Serialize;

use crate::models::{MealSlot, MenuType, NutritionTotals};
use crate::nutrition::{DayAllergyAlerts, DaySummary};
use crate::session::MenuSession;

// ============================================================================
// Color Constants (RGB 0-255)
// ============================================================================

const COLOR_TITLE: (u8, u8, u8) = (0, 112, 60);
const COLOR_DAY: (u8, u8, u8) = (0, 80, 140);
const COLOR_ALERT: (u8, u8, u8) = (192, 0, 0);
const COLOR_BLACK: (u8, u8, u8) = (0, 0, 0);
const COLOR_GRAY: (u8, u8, u8) = (128, 128, 128);

/// Rendered in place of a nutrition value when nothing resolved
pub const ABSENT: &str = "—";

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN_LEFT: f32 = 15.0;
const MARGIN_BOTTOM: f32 = 20.0;
const WRAP_CHARS: usize = 95;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ExportWeekMenuResponse {
    pub success: bool,
    pub file_path: String,
    pub week_start: NaiveDate,
    pub menu_type: MenuType,
    pub days_with_meals: usize,
    pub alert_count: usize,
    /// The export reflects the session, which may hold unsaved edits
    pub includes_unsaved_changes: bool,
    pub message: String,
}

// ============================================================================
// Report Data
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeal {
    pub slot: MealSlot,
    pub time: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDay {
    pub summary: DaySummary,
    pub meals: Vec<ReportMeal>,
    pub notes: Option<String>,
}

/// Everything the PDF shows, taken from a session
#[derive(Debug, Clone, Serialize)]
pub struct WeekReport {
    pub week_start: NaiveDate,
    pub menu_type: MenuType,
    pub days: Vec<ReportDay>,
    pub alerts: Vec<DayAllergyAlerts>,
}

pub fn build_week_report(session: &MenuSession) -> WeekReport {
    let summary = session.week_summary();
    let days = session
        .items()
        .iter()
        .zip(summary)
        .map(|(item, summary)| ReportDay {
            summary,
            meals: session
                .menu_type()
                .slots()
                .iter()
                .filter(|slot| !item.text(**slot).is_empty())
                .map(|slot| ReportMeal {
                    slot: *slot,
                    time: item.time(*slot).map(str::to_string),
                    text: item.text(*slot).to_string(),
                })
                .collect(),
            notes: item.notes.clone(),
        })
        .collect();

    WeekReport {
        week_start: session.week_start(),
        menu_type: session.menu_type(),
        days,
        alerts: session.week_allergy_alerts(),
    }
}

// ============================================================================
// Formatting
// ============================================================================

fn day_abbrev(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// One-line nutrition summary of a day
pub fn format_totals_line(totals: Option<&NutritionTotals>) -> String {
    match totals {
        Some(t) => format!(
            "Energy {:.0} kcal | Protein {:.1} g | Lipid {:.1} g | Carbs {:.1} g | Fiber {:.1} g | Ca {:.0} mg | Fe {:.1} mg | Na {:.0} mg | Vit C {:.1} mg | Vit A {:.0} ug",
            t.energy, t.protein, t.lipid, t.carbohydrate, t.fiber, t.calcium, t.iron, t.sodium, t.vitamin_c, t.vitamin_a
        ),
        None => format!("Nutrition: {}", ABSENT),
    }
}

/// Greedy word wrap
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ============================================================================
// Chart Generation
// ============================================================================

/// Energy-by-day bar chart as PNG bytes. Absent days have no bar.
pub fn generate_energy_chart(days: &[DaySummary], width: u32, height: u32) -> Result<Vec<u8>, String> {
    use plotters::prelude::*;

    let max_energy = days
        .iter()
        .filter_map(|d| d.totals.map(|t| t.energy))
        .fold(f64::NEG_INFINITY, f64::max);
    if !max_energy.is_finite() {
        return Err("No nutrition data to chart".to_string());
    }

    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let y_max = (max_energy * 1.15).max(100.0);

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(-0.5f64..(days.len() as f64 - 0.5), 0f64..y_max)
            .map_err(|e| e.to_string())?;

        chart.configure_mesh()
            .disable_x_mesh()
            .x_labels(days.len() * 2 + 1)
            .x_label_formatter(&|x| {
                let idx = x.round();
                if (x - idx).abs() < 0.01 && idx >= 0.0 && (idx as usize) < days.len() {
                    day_abbrev(days[idx as usize].weekday).to_string()
                } else {
                    String::new()
                }
            })
            .y_desc("kcal")
            .draw()
            .map_err(|e| e.to_string())?;

        let bar_color = RGBColor(COLOR_TITLE.0, COLOR_TITLE.1, COLOR_TITLE.2);
        chart.draw_series(days.iter().enumerate().filter_map(|(i, d)| {
            d.totals.map(|t| {
                let x = i as f64;
                Rectangle::new([(x - 0.3, 0.0), (x + 0.3, t.energy)], bar_color.filled())
            })
        })).map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
    }

    // Convert RGB buffer to PNG
    let img = RgbImage::from_raw(width, height, buffer)
        .ok_or("Failed to create image from buffer")?;

    let mut png_bytes = Vec::new();
    let dyn_img = DynamicImage::ImageRgb8(img);
    dyn_img.write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| e.to_string())?;

    Ok(png_bytes)
}

// ============================================================================
// PDF Generation Helper Functions
// ============================================================================

fn rgb_to_printpdf(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

fn add_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    x: Mm,
    y: Mm,
    size: f32,
    color: (u8, u8, u8),
) {
    layer.set_fill_color(rgb_to_printpdf(color.0, color.1, color.2));
    layer.use_text(text, size, x, y, font);
}

fn add_line(
    layer: &PdfLayerReference,
    x1: Mm,
    y1: Mm,
    x2: Mm,
    y2: Mm,
    color: (u8, u8, u8),
    width: f32,
) {
    layer.set_outline_color(rgb_to_printpdf(color.0, color.1, color.2));
    layer.set_outline_thickness(width);

    let line = Line {
        points: vec![
            (Point::new(x1, y1), false),
            (Point::new(x2, y2), false),
        ],
        is_closed: false,
    };
    layer.add_line(line);
}

/// Portrait page cursor that starts a new page when the bottom is reached
struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl<'a> PageCursor<'a> {
    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed < MARGIN_BOTTOM {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Menu");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - 20.0;
        }
    }
}

// ============================================================================
// Weekly Menu Report
// ============================================================================

/// Render a week report to `output_path`
pub fn render_week_pdf(report: &WeekReport, output_path: &Path) -> Result<(), String> {
    let monday = report.week_start;
    let friday = monday + chrono::Duration::days(4);
    let title = format!("Weekly Menu - {}", report.menu_type.label());

    let (doc, page1, layer1) = PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

    let font = doc.add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| e.to_string())?;
    let font_bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| e.to_string())?;

    let mut cursor = PageCursor {
        doc: &doc,
        layer: doc.get_page(page1).get_layer(layer1),
        y: PAGE_HEIGHT - 20.0,
    };

    // Title
    add_text(&cursor.layer, &font_bold, &title, Mm(MARGIN_LEFT), Mm(cursor.y), 18.0, COLOR_TITLE);
    cursor.y -= 8.0;
    add_text(
        &cursor.layer,
        &font,
        &format!("Week: {} to {} (week {})", monday, friday, monday.iso_week().week()),
        Mm(MARGIN_LEFT),
        Mm(cursor.y),
        11.0,
        COLOR_BLACK,
    );
    let now = chrono::Local::now().format("%Y-%m-%d").to_string();
    add_text(&cursor.layer, &font, &format!("Generated: {}", now), Mm(140.0), Mm(cursor.y), 11.0, COLOR_BLACK);
    cursor.y -= 6.0;
    add_line(&cursor.layer, Mm(MARGIN_LEFT), Mm(cursor.y), Mm(PAGE_WIDTH - MARGIN_LEFT), Mm(cursor.y), COLOR_GRAY, 0.5);
    cursor.y -= 8.0;

    // One block per weekday
    for day in &report.days {
        cursor.ensure_space(20.0);
        add_text(
            &cursor.layer,
            &font_bold,
            &format!("{} {}", day.summary.day_name, day.summary.date.format("%d/%m")),
            Mm(MARGIN_LEFT),
            Mm(cursor.y),
            12.0,
            COLOR_DAY,
        );
        cursor.y -= 6.0;

        if day.meals.is_empty() {
            add_text(&cursor.layer, &font, "No meals planned", Mm(MARGIN_LEFT + 4.0), Mm(cursor.y), 9.0, COLOR_GRAY);
            cursor.y -= 5.0;
        }

        for meal in &day.meals {
            let heading = match &meal.time {
                Some(time) => format!("{} ({}):", meal.slot.label(), time),
                None => format!("{}:", meal.slot.label()),
            };
            for (i, line) in wrap_text(&format!("{} {}", heading, meal.text), WRAP_CHARS).iter().enumerate() {
                cursor.ensure_space(5.0);
                let indent = if i == 0 { 4.0 } else { 8.0 };
                add_text(&cursor.layer, &font, line, Mm(MARGIN_LEFT + indent), Mm(cursor.y), 9.0, COLOR_BLACK);
                cursor.y -= 4.5;
            }
        }

        if let Some(notes) = day.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            for line in wrap_text(&format!("Notes: {}", notes), WRAP_CHARS) {
                cursor.ensure_space(5.0);
                add_text(&cursor.layer, &font, &line, Mm(MARGIN_LEFT + 4.0), Mm(cursor.y), 8.0, COLOR_GRAY);
                cursor.y -= 4.5;
            }
        }

        cursor.ensure_space(5.0);
        add_text(
            &cursor.layer,
            &font,
            &format_totals_line(day.summary.totals.as_ref()),
            Mm(MARGIN_LEFT + 4.0),
            Mm(cursor.y),
            7.5,
            COLOR_DAY,
        );
        cursor.y -= 8.0;
    }

    // Allergy warnings
    cursor.ensure_space(15.0);
    add_line(&cursor.layer, Mm(MARGIN_LEFT), Mm(cursor.y), Mm(PAGE_WIDTH - MARGIN_LEFT), Mm(cursor.y), COLOR_GRAY, 0.5);
    cursor.y -= 7.0;
    add_text(&cursor.layer, &font_bold, "Allergy Warnings", Mm(MARGIN_LEFT), Mm(cursor.y), 12.0, COLOR_ALERT);
    cursor.y -= 6.0;

    if report.alerts.is_empty() {
        add_text(&cursor.layer, &font, "No allergy conflicts found for this week.", Mm(MARGIN_LEFT + 4.0), Mm(cursor.y), 9.0, COLOR_BLACK);
    }
    for day in &report.alerts {
        for alert in &day.alerts {
            let line = format!(
                "{}: {} (allergies: {}) - matched {}",
                day.day_name,
                alert.child_name,
                alert.allergies,
                alert.matched_terms.join(", ")
            );
            for wrapped in wrap_text(&line, WRAP_CHARS) {
                cursor.ensure_space(5.0);
                add_text(&cursor.layer, &font, &wrapped, Mm(MARGIN_LEFT + 4.0), Mm(cursor.y), 9.0, COLOR_ALERT);
                cursor.y -= 4.5;
            }
        }
    }

    // ========================================================================
    // Landscape page for the chart
    // ========================================================================
    let summaries: Vec<DaySummary> = report.days.iter().map(|d| d.summary.clone()).collect();
    if summaries.iter().any(|d| d.totals.is_some()) {
        let (page2, layer2) = doc.add_page(Mm(PAGE_HEIGHT), Mm(PAGE_WIDTH), "Chart Page");
        let layer2 = doc.get_page(page2).get_layer(layer2);
        let mut y2 = PAGE_WIDTH - 20.0;

        add_text(&layer2, &font_bold, "Energy by Day", Mm(MARGIN_LEFT), Mm(y2), 16.0, COLOR_TITLE);
        add_text(&layer2, &font, &format!("{} - {}", monday, friday), Mm(120.0), Mm(y2), 11.0, COLOR_BLACK);
        y2 -= 10.0;

        match generate_energy_chart(&summaries, 1000, 400) {
            Ok(png_bytes) => {
                let dynamic_image = printpdf::image_crate::load_from_memory(&png_bytes)
                    .map_err(|e| e.to_string())?;
                let pdf_image = Image::from_dynamic_image(&dynamic_image);

                // 1000x400 pixels at 120 DPI, about 212mm x 85mm
                let transform = ImageTransform {
                    translate_x: Some(Mm(MARGIN_LEFT)),
                    translate_y: Some(Mm(y2 - 90.0)),
                    dpi: Some(120.0),
                    ..Default::default()
                };

                pdf_image.add_to_layer(layer2.clone(), transform);
            }
            Err(e) => {
                tracing::warn!("Energy chart generation failed: {}", e);
                add_text(&layer2, &font, &format!("Chart generation error: {}", e), Mm(MARGIN_LEFT), Mm(y2 - 10.0), 9.0, COLOR_ALERT);
            }
        }
    }

    // Save PDF
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    let file = File::create(output_path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer).map_err(|e| e.to_string())?;

    Ok(())
}

/// Default file name, e.g. `menu_toddler_2026-10-19.pdf`
pub fn default_report_name(week_start: NaiveDate, menu_type: MenuType) -> String {
    format!("menu_{}_{}.pdf", menu_type.as_str(), week_start)
}

/// Export a session's week to PDF
pub fn export_week_menu_pdf(session: &MenuSession, output_path: &Path) -> Result<ExportWeekMenuResponse, String> {
    let report = build_week_report(session);
    render_week_pdf(&report, output_path)?;

    let days_with_meals = report.days.iter().filter(|d| !d.meals.is_empty()).count();
    let alert_count = report.alerts.iter().map(|d| d.alerts.len()).sum();
    let file_path = output_path.display().to_string();

    tracing::info!("Exported weekly menu PDF to {}", file_path);

    Ok(ExportWeekMenuResponse {
        success: true,
        message: format!(
            "Weekly menu exported with {} planned day(s) and {} allergy warning(s)",
            days_with_meals, alert_count
        ),
        file_path,
        week_start: report.week_start,
        menu_type: report.menu_type,
        days_with_meals,
        alert_count,
        includes_unsaved_changes: session.is_dirty(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChildAllergyRecord, FactBasis, MenuItem, NutrientFact};
    use crate::nutrition::FactTable;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_absent_totals_render_as_dash() {
        assert_eq!(format_totals_line(None), "Nutrition: —");
        let line = format_totals_line(Some(&NutritionTotals { energy: 512.4, ..NutritionTotals::zero() }));
        assert!(line.starts_with("Energy 512 kcal"));
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("arroz feijao frango", 12), vec!["arroz feijao", "frango"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn test_chart_requires_data() {
        let session = MenuSession::new(monday(), MenuType::Toddler, Vec::new(), FactTable::default(), Vec::new());
        assert!(generate_energy_chart(&session.week_summary(), 400, 200).is_err());
    }

    #[test]
    fn test_build_week_report() {
        let mut lunch = MenuItem::empty(monday(), Weekday::Wed, MenuType::Toddler);
        lunch.set_text(MealSlot::Lunch, "Frango com amendoim");
        lunch.set_time(MealSlot::Lunch, Some("11:00".to_string()));
        let roster = vec![ChildAllergyRecord {
            id: 1,
            name: "Ana".to_string(),
            allergies: Some("Amendoim".to_string()),
            active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }];

        let session = MenuSession::new(monday(), MenuType::Toddler, vec![lunch], FactTable::default(), roster);
        let report = build_week_report(&session);

        assert_eq!(report.days.len(), 5);
        assert_eq!(report.days[2].meals.len(), 1);
        assert_eq!(report.days[2].meals[0].time.as_deref(), Some("11:00"));
        assert!(report.days[2].summary.totals.is_none());
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(default_report_name(report.week_start, report.menu_type), "menu_toddler_2026-10-19.pdf");
    }

    #[test]
    fn test_export_writes_pdf() {
        let feijao = NutrientFact {
            id: 1,
            name: "Feijão carioca cozido".to_string(),
            basis: FactBasis::Per100g,
            portion_grams: Some(80.0),
            nutrition: NutritionTotals { energy: 76.0, protein: 4.8, ..NutritionTotals::zero() },
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let mut lunch = MenuItem::empty(monday(), Weekday::Mon, MenuType::Toddler);
        lunch.set_text(MealSlot::Lunch, "Feijão 100g, maçã");

        let session = MenuSession::new(monday(), MenuType::Toddler, vec![lunch], FactTable::new(vec![feijao]), Vec::new());
        let summary = session.week_summary();
        assert!(summary[0].totals.is_some());
        assert!(summary[1..].iter().all(|d| d.totals.is_none()));

        let path = std::env::temp_dir().join(format!("menuplan_export_{}.pdf", std::process::id()));
        let result = export_week_menu_pdf(&session, &path).unwrap();

        assert!(result.success);
        assert_eq!(result.days_with_meals, 1);
        assert_eq!(result.alert_count, 0);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        std::fs::remove_file(&path).ok();
    }
}
