use eframe::egui;

use crate::media::VideoFrame;

/// Uploads `frame` into `slot`, reusing the texture once it exists.
pub fn update_texture(
    ctx: &egui::Context,
    slot: &mut Option<egui::TextureHandle>,
    name: &str,
    frame: Option<&VideoFrame>,
) {
    let Some(frame) = frame.filter(|f| f.is_well_formed() && f.width > 0 && f.height > 0) else {
        return;
    };
    let image =
        egui::ColorImage::from_rgb([frame.width as usize, frame.height as usize], &frame.bytes);
    match slot {
        Some(tex) => tex.set(image, egui::TextureOptions::default()),
        None => *slot = Some(ctx.load_texture(name, image, egui::TextureOptions::default())),
    }
}

/// Draws a video texture scaled to fit `max_w` x `max_h`, or a placeholder.
pub fn show_video(
    ui: &mut egui::Ui,
    texture: Option<&egui::TextureHandle>,
    max_w: f32,
    max_h: f32,
    placeholder: &str,
) {
    if let Some(tex) = texture {
        let size = tex.size_vec2();
        let scale = (max_w / size.x).min(max_h / size.y).min(1.0);
        ui.image(egui::load::SizedTexture::new(tex.id(), size * scale));
    } else {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(max_w, max_h), egui::Sense::hover());
        ui.painter().rect_filled(rect, 4.0, egui::Color32::from_gray(24));
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            placeholder,
            egui::FontId::proportional(14.0),
            egui::Color32::DARK_GRAY,
        );
    }
}
