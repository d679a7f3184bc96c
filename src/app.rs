use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};

use crate::api::{ApiClient, Cuisine, Customer, MediaRef, Product, ProductMedia, Vendor};
use crate::gallery::{self, GalleryState, MediaKind, PreviewItem};
use crate::resolver::{self, FetchedPreview};

const APP_TITLE: &str = "Souk Admin";
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const VENDOR_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);
const VENDOR_SEARCH_MIN_CHARS: usize = 2;
const POLL_REPAINT_INTERVAL: Duration = Duration::from_millis(100);
const GALLERY_MEDIA_MAX_SIZE: f32 = 460.0;
const LIST_THUMB_MAX_SIZE: f32 = 32.0;
const MEDIA_STRIP_THUMB_MAX_SIZE: f32 = 60.0;
const MEDIA_FILE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "mp4", "webm", "mov",
];

type TaskReceiver<T> = Receiver<Result<T, String>>;

fn spawn_task<T, F>(task: F) -> TaskReceiver<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(task().map_err(|err| format!("{err:#}")));
    });
    rx
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Vendors,
    Products,
    Customers,
    Cuisines,
}

impl Screen {
    fn label(self) -> &'static str {
        match self {
            Screen::Vendors => "Vendors",
            Screen::Products => "Products",
            Screen::Customers => "Customers",
            Screen::Cuisines => "Cuisines",
        }
    }
}

/// What the open gallery is previewing, which decides what Delete means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GalleryOrigin {
    /// Product form preview; persisted items delete through the media API.
    Product { product_id: Option<i64> },
    /// Vendor image preview; delete clears the form field and closes.
    VendorImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaDeleteSource {
    Gallery,
    Strip,
}

enum MediaTexture {
    Loading(TaskReceiver<ColorImage>),
    Ready(TextureHandle),
    Failed,
}

struct ListState<T> {
    rows: Vec<T>,
    loaded: bool,
    receiver: Option<TaskReceiver<Vec<T>>>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            loaded: false,
            receiver: None,
        }
    }
}

impl<T> ListState<T> {
    fn invalidate(&mut self) {
        self.loaded = false;
    }

    fn needs_fetch(&self) -> bool {
        !self.loaded && self.receiver.is_none()
    }

    fn is_loading(&self) -> bool {
        self.receiver.is_some()
    }

    fn poll(&mut self, status_line: &mut String, what: &str) {
        let Some(receiver) = self.receiver.take() else {
            return;
        };
        match receiver.try_recv() {
            Ok(Ok(rows)) => {
                self.rows = rows;
                self.loaded = true;
            }
            Ok(Err(err)) => {
                self.loaded = true;
                *status_line = format!("Could not load {what}: {err}");
            }
            Err(TryRecvError::Empty) => self.receiver = Some(receiver),
            Err(TryRecvError::Disconnected) => {
                self.loaded = true;
                *status_line = format!("Load worker for {what} disconnected.");
            }
        }
    }
}

enum ListAction {
    New,
    Edit(usize),
    DeleteRow(i64),
}

#[derive(Default)]
struct VendorFormState {
    id: Option<i64>,
    name: String,
    image: String,
    supported_categories: String,
    address1: String,
    address2: String,
    state: String,
    landmark: String,
    pincode: String,
    contact_name: String,
    phone_number: String,
    email: String,
}

struct ProductFormState {
    id: Option<i64>,
    name: String,
    sku: String,
    price: String,
    vendor_id: Option<i64>,
    vendor_search: String,
    available: bool,
    category_details: String,
    schedule: String,
    media_urls: String,
    local_files: Vec<PathBuf>,
    persisted_media: Vec<ProductMedia>,
    media_loaded: bool,
    media_stale: bool,
}

impl Default for ProductFormState {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            sku: String::new(),
            price: String::new(),
            vendor_id: None,
            vendor_search: String::new(),
            available: true,
            category_details: String::new(),
            schedule: String::new(),
            media_urls: String::new(),
            local_files: Vec::new(),
            persisted_media: Vec::new(),
            media_loaded: false,
            media_stale: false,
        }
    }
}

#[derive(Default)]
struct CustomerFormState {
    id: Option<i64>,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
}

#[derive(Default)]
struct CuisineFormState {
    id: Option<i64>,
    cuisine_name: String,
    category: String,
    subcategory: String,
    region: String,
}

pub struct SoukAdminApp {
    api: Arc<ApiClient>,
    screen: Screen,
    status_line: String,

    vendors: ListState<Vendor>,
    products: ListState<Product>,
    customers: ListState<Customer>,
    cuisines: ListState<Cuisine>,

    vendor_form: Option<VendorFormState>,
    product_form: Option<ProductFormState>,
    customer_form: Option<CustomerFormState>,
    cuisine_form: Option<CuisineFormState>,

    vendor_options: Vec<Vendor>,
    vendor_options_receiver: Option<TaskReceiver<Vec<Vendor>>>,
    vendor_search_edited_at: Option<Instant>,

    save_task: Option<(Screen, TaskReceiver<String>)>,
    row_delete_task: Option<(Screen, TaskReceiver<()>)>,
    product_media_receiver: Option<TaskReceiver<Vec<ProductMedia>>>,

    preview_task: Option<(GalleryOrigin, Receiver<Vec<PreviewItem>>)>,
    gallery: Option<GalleryState>,
    gallery_origin: GalleryOrigin,
    media_delete: Option<(MediaDeleteSource, i64, TaskReceiver<()>)>,

    media_textures: HashMap<String, MediaTexture>,
}

impl SoukAdminApp {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api: Arc::new(api),
            screen: Screen::Products,
            status_line: String::new(),
            vendors: ListState::default(),
            products: ListState::default(),
            customers: ListState::default(),
            cuisines: ListState::default(),
            vendor_form: None,
            product_form: None,
            customer_form: None,
            cuisine_form: None,
            vendor_options: Vec::new(),
            vendor_options_receiver: None,
            vendor_search_edited_at: None,
            save_task: None,
            row_delete_task: None,
            product_media_receiver: None,
            preview_task: None,
            gallery: None,
            gallery_origin: GalleryOrigin::Product { product_id: None },
            media_delete: None,
            media_textures: HashMap::new(),
        }
    }

    fn apply_dark_visuals(ctx: &egui::Context) {
        let mut visuals = egui::Visuals::dark();
        let line_base = egui::Color32::from_gray(36);
        visuals.panel_fill = egui::Color32::from_gray(16);
        visuals.window_fill = egui::Color32::from_gray(20);
        visuals.window_stroke = egui::Stroke::new(1.0, line_base);
        visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(1.0, line_base);
        ctx.set_visuals(visuals);
    }

    fn is_loading(&self) -> bool {
        self.vendors.is_loading()
            || self.products.is_loading()
            || self.customers.is_loading()
            || self.cuisines.is_loading()
            || self.vendor_options_receiver.is_some()
            || self.save_task.is_some()
            || self.row_delete_task.is_some()
            || self.product_media_receiver.is_some()
            || self.preview_task.is_some()
            || self.media_delete.is_some()
            || self
                .media_textures
                .values()
                .any(|texture| matches!(texture, MediaTexture::Loading(_)))
    }

    fn poll_background_tasks(&mut self) {
        self.vendors.poll(&mut self.status_line, "vendors");
        self.products.poll(&mut self.status_line, "products");
        self.customers.poll(&mut self.status_line, "customers");
        self.cuisines.poll(&mut self.status_line, "cuisines");
        self.poll_vendor_options();
        self.poll_product_media();
        self.poll_save_task();
        self.poll_row_delete_task();
        self.poll_preview_task();
        self.poll_media_delete();
    }

    fn poll_vendor_options(&mut self) {
        let Some(receiver) = self.vendor_options_receiver.take() else {
            return;
        };
        match receiver.try_recv() {
            Ok(Ok(vendors)) => self.vendor_options = vendors,
            Ok(Err(err)) => self.status_line = format!("Vendor search failed: {err}"),
            Err(TryRecvError::Empty) => self.vendor_options_receiver = Some(receiver),
            Err(TryRecvError::Disconnected) => {
                self.status_line = "Vendor search worker disconnected.".to_string();
            }
        }
    }

    fn poll_product_media(&mut self) {
        let Some(receiver) = self.product_media_receiver.take() else {
            return;
        };
        match receiver.try_recv() {
            Ok(Ok(media)) => {
                if let Some(form) = self.product_form.as_mut() {
                    form.persisted_media = media;
                    form.media_loaded = true;
                    form.media_stale = false;
                }
            }
            Ok(Err(err)) => {
                if let Some(form) = self.product_form.as_mut() {
                    form.media_loaded = true;
                    form.media_stale = false;
                }
                self.status_line = format!("Could not load product media: {err}");
            }
            Err(TryRecvError::Empty) => self.product_media_receiver = Some(receiver),
            Err(TryRecvError::Disconnected) => {
                self.status_line = "Product media worker disconnected.".to_string();
            }
        }
    }

    fn poll_save_task(&mut self) {
        let Some((screen, receiver)) = self.save_task.take() else {
            return;
        };
        match receiver.try_recv() {
            Ok(Ok(message)) => {
                self.status_line = message;
                match screen {
                    Screen::Vendors => {
                        self.vendor_form = None;
                        self.vendors.invalidate();
                    }
                    Screen::Products => {
                        self.product_form = None;
                        self.products.invalidate();
                    }
                    Screen::Customers => {
                        self.customer_form = None;
                        self.customers.invalidate();
                    }
                    Screen::Cuisines => {
                        self.cuisine_form = None;
                        self.cuisines.invalidate();
                    }
                }
            }
            Ok(Err(err)) => self.status_line = format!("Save failed: {err}"),
            Err(TryRecvError::Empty) => self.save_task = Some((screen, receiver)),
            Err(TryRecvError::Disconnected) => {
                self.status_line = "Save worker disconnected.".to_string();
            }
        }
    }

    fn poll_row_delete_task(&mut self) {
        let Some((screen, receiver)) = self.row_delete_task.take() else {
            return;
        };
        match receiver.try_recv() {
            Ok(Ok(())) => {
                self.status_line = "Deleted.".to_string();
                match screen {
                    Screen::Vendors => self.vendors.invalidate(),
                    Screen::Products => self.products.invalidate(),
                    Screen::Customers => self.customers.invalidate(),
                    Screen::Cuisines => self.cuisines.invalidate(),
                }
            }
            Ok(Err(err)) => self.status_line = format!("Delete failed: {err}"),
            Err(TryRecvError::Empty) => self.row_delete_task = Some((screen, receiver)),
            Err(TryRecvError::Disconnected) => {
                self.status_line = "Delete worker disconnected.".to_string();
            }
        }
    }

    fn poll_preview_task(&mut self) {
        let Some((origin, receiver)) = self.preview_task.take() else {
            return;
        };
        match receiver.try_recv() {
            Ok(items) => {
                self.gallery = Some(GalleryState::open(items, 0));
                self.gallery_origin = origin;
            }
            Err(TryRecvError::Empty) => self.preview_task = Some((origin, receiver)),
            Err(TryRecvError::Disconnected) => {
                self.status_line = "Preview worker disconnected.".to_string();
            }
        }
    }

    fn poll_media_delete(&mut self) {
        let Some((source, media_id, receiver)) = self.media_delete.take() else {
            return;
        };
        match receiver.try_recv() {
            Ok(Ok(())) => {
                if source == MediaDeleteSource::Gallery {
                    // Remove the invoked item, not whatever the cursor moved
                    // to while the delete was in flight.
                    if let Some(gallery) = self.gallery.as_mut() {
                        gallery.remove_by_media_id(media_id);
                    }
                }
                self.status_line = "Media deleted.".to_string();
                self.invalidate_product_media();
            }
            // Delete failures stay out of the UI; state is left untouched.
            Ok(Err(err)) => log::warn!("Media delete failed: {err}"),
            Err(TryRecvError::Empty) => self.media_delete = Some((source, media_id, receiver)),
            Err(TryRecvError::Disconnected) => {
                log::warn!("Media delete worker disconnected");
            }
        }
    }

    /// Marks the edit form's persisted media stale so it refetches on the
    /// next frame.
    fn invalidate_product_media(&mut self) {
        if let Some(form) = self.product_form.as_mut() {
            if form.id.is_some() {
                form.media_stale = true;
            }
        }
    }

    fn ensure_screen_data(&mut self) {
        match self.screen {
            Screen::Vendors => {
                if self.vendors.needs_fetch() {
                    let api = Arc::clone(&self.api);
                    self.vendors.receiver = Some(spawn_task(move || api.list_vendors(None)));
                }
            }
            Screen::Products => {
                if self.products.needs_fetch() {
                    let api = Arc::clone(&self.api);
                    self.products.receiver = Some(spawn_task(move || api.list_products()));
                }
            }
            Screen::Customers => {
                if self.customers.needs_fetch() {
                    let api = Arc::clone(&self.api);
                    self.customers.receiver = Some(spawn_task(move || api.list_customers()));
                }
            }
            Screen::Cuisines => {
                if self.cuisines.needs_fetch() {
                    let api = Arc::clone(&self.api);
                    self.cuisines.receiver = Some(spawn_task(move || api.list_cuisines()));
                }
            }
        }

        if let Some(form) = self.product_form.as_ref() {
            if let Some(product_id) = form.id {
                let needs_media = (!form.media_loaded || form.media_stale)
                    && self.product_media_receiver.is_none();
                if needs_media {
                    let api = Arc::clone(&self.api);
                    self.product_media_receiver =
                        Some(spawn_task(move || api.list_product_media(product_id)));
                }
            }
        }
    }

    fn tick_vendor_search_debounce(&mut self, ctx: &egui::Context) {
        let Some(edited_at) = self.vendor_search_edited_at else {
            return;
        };
        let elapsed = edited_at.elapsed();
        if elapsed < VENDOR_SEARCH_DEBOUNCE {
            ctx.request_repaint_after(VENDOR_SEARCH_DEBOUNCE - elapsed);
            return;
        }
        self.vendor_search_edited_at = None;

        let term = self
            .product_form
            .as_ref()
            .map(|form| form.vendor_search.trim().to_string())
            .unwrap_or_default();
        let api = Arc::clone(&self.api);
        self.vendor_options_receiver = Some(spawn_task(move || {
            if term.chars().count() >= VENDOR_SEARCH_MIN_CHARS {
                api.list_vendors(Some(&term))
            } else {
                api.list_vendors(None)
            }
        }));
    }

    fn start_vendor_options_load(&mut self) {
        if self.vendor_options_receiver.is_some() {
            return;
        }
        let api = Arc::clone(&self.api);
        self.vendor_options_receiver = Some(spawn_task(move || api.list_vendors(None)));
    }

    fn start_product_preview(&mut self, form: &ProductFormState) {
        if self.preview_task.is_some() {
            self.status_line = "Preview already being prepared.".to_string();
            return;
        }
        let api = Arc::clone(&self.api);
        let persisted = form.persisted_media.clone();
        let local_files = form.local_files.clone();
        let url_text = form.media_urls.clone();
        let origin = GalleryOrigin::Product {
            product_id: form.id,
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let items =
                resolver::assemble_preview_items(&persisted, &local_files, &url_text, |url| {
                    api.fetch_preview(url).map(|preview| FetchedPreview {
                        local_url: preview.local_url,
                        mime_type: preview.mime_type,
                        size_bytes: preview.size,
                    })
                });
            let _ = tx.send(items);
        });
        self.preview_task = Some((origin, rx));
    }

    fn start_vendor_image_preview(&mut self, image_url: &str) {
        if self.preview_task.is_some() {
            self.status_line = "Preview already being prepared.".to_string();
            return;
        }
        let api = Arc::clone(&self.api);
        let url = image_url.to_string();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let item = match api.fetch_preview(&url) {
                Ok(preview) => PreviewItem {
                    url: preview.local_url,
                    kind: None,
                    title: None,
                    mime_type: preview.mime_type,
                    size_bytes: preview.size,
                    download_url: Some(url),
                    delete_media_id: None,
                },
                Err(err) => {
                    log::warn!("Preview fetch failed for {url}: {err:#}");
                    PreviewItem::from_url(url)
                }
            };
            let _ = tx.send(vec![item]);
        });
        self.preview_task = Some((GalleryOrigin::VendorImage, rx));
    }

    fn start_media_delete(&mut self, source: MediaDeleteSource, product_id: i64, media_id: i64) {
        if self.media_delete.is_some() {
            return;
        }
        let api = Arc::clone(&self.api);
        self.media_delete = Some((
            source,
            media_id,
            spawn_task(move || api.delete_product_media(product_id, media_id)),
        ));
    }

    fn ensure_media_texture(
        &mut self,
        ctx: &egui::Context,
        reference: &str,
    ) -> Option<TextureHandle> {
        let key = self.api.absolute_url(reference);
        match self.media_textures.get_mut(&key) {
            Some(MediaTexture::Ready(handle)) => return Some(handle.clone()),
            Some(MediaTexture::Failed) => return None,
            Some(MediaTexture::Loading(receiver)) => {
                return match receiver.try_recv() {
                    Ok(Ok(color_image)) => {
                        let handle = ctx.load_texture(
                            format!("media:{key}"),
                            color_image,
                            TextureOptions::LINEAR,
                        );
                        self.media_textures
                            .insert(key, MediaTexture::Ready(handle.clone()));
                        Some(handle)
                    }
                    Ok(Err(err)) => {
                        log::warn!("Media load failed for {key}: {err}");
                        self.media_textures.insert(key, MediaTexture::Failed);
                        None
                    }
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => {
                        self.media_textures.insert(key, MediaTexture::Failed);
                        None
                    }
                };
            }
            None => {}
        }

        let api = Arc::clone(&self.api);
        let target = key.clone();
        let receiver = spawn_task(move || {
            let bytes = load_media_bytes(&api, &target)?;
            decode_color_image(&bytes)
        });
        self.media_textures
            .insert(key, MediaTexture::Loading(receiver));
        None
    }

    fn draw_media_thumb(
        &mut self,
        ui: &mut egui::Ui,
        ctx: &egui::Context,
        reference: &str,
        max_size: f32,
    ) {
        match self.ensure_media_texture(ctx, reference) {
            Some(texture) => draw_scaled_texture(ui, &texture, max_size),
            None => {
                ui.label("-");
            }
        }
    }

    fn show_nav_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("nav-bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(format!("{APP_TITLE} v{APP_VERSION}"))
                        .strong()
                        .size(16.0),
                );
                ui.separator();
                for screen in [
                    Screen::Vendors,
                    Screen::Products,
                    Screen::Customers,
                    Screen::Cuisines,
                ] {
                    if ui
                        .selectable_label(self.screen == screen, screen.label())
                        .clicked()
                    {
                        self.screen = screen;
                    }
                }
            });
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status-bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.is_loading() {
                    ui.spinner();
                }
                ui.label(&self.status_line);
            });
        });
    }

    fn show_vendors_screen(&mut self, ui: &mut egui::Ui) {
        if let Some(mut form) = self.vendor_form.take() {
            let keep_open = self.show_vendor_form(ui, &mut form);
            if keep_open {
                self.vendor_form = Some(form);
            }
            return;
        }

        let mut action = None;
        ui.horizontal(|ui| {
            ui.heading("Vendors");
            if ui.button("New Vendor").clicked() {
                action = Some(ListAction::New);
            }
        });
        if !self.vendors.loaded {
            ui.label("Loading vendors...");
            return;
        }
        let delete_busy = self.row_delete_task.is_some();
        egui::Grid::new("vendors-table")
            .striped(true)
            .num_columns(5)
            .show(ui, |ui| {
                ui.strong("ID");
                ui.strong("Name");
                ui.strong("Contact");
                ui.strong("Email");
                ui.strong("");
                ui.end_row();
                for (row_index, vendor) in self.vendors.rows.iter().enumerate() {
                    ui.label(
                        vendor
                            .vendor_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    );
                    ui.label(&vendor.name);
                    ui.label(vendor.contact_name.as_deref().unwrap_or("-"));
                    ui.label(vendor.email.as_deref().unwrap_or("-"));
                    ui.horizontal(|ui| {
                        if ui.button("Edit").clicked() {
                            action = Some(ListAction::Edit(row_index));
                        }
                        if let Some(vendor_id) = vendor.vendor_id {
                            if ui
                                .add_enabled(!delete_busy, egui::Button::new("Delete"))
                                .clicked()
                            {
                                action = Some(ListAction::DeleteRow(vendor_id));
                            }
                        }
                    });
                    ui.end_row();
                }
            });

        match action {
            Some(ListAction::New) => self.vendor_form = Some(VendorFormState::default()),
            Some(ListAction::Edit(row_index)) => {
                if let Some(vendor) = self.vendors.rows.get(row_index) {
                    self.vendor_form = Some(vendor_form_from(vendor));
                }
            }
            Some(ListAction::DeleteRow(vendor_id)) => {
                let api = Arc::clone(&self.api);
                self.row_delete_task = Some((
                    Screen::Vendors,
                    spawn_task(move || api.delete_vendor(vendor_id)),
                ));
            }
            None => {}
        }
    }

    fn show_vendor_form(&mut self, ui: &mut egui::Ui, form: &mut VendorFormState) -> bool {
        let mut keep_open = true;
        match form.id {
            Some(id) => ui.heading(format!("Edit Vendor #{id}")),
            None => ui.heading("Create Vendor"),
        };
        ui.add_space(6.0);

        labeled_single_line(ui, "Name", &mut form.name);
        labeled_single_line(ui, "Image URL", &mut form.image);
        let can_preview = !form.image.trim().is_empty() && self.preview_task.is_none();
        if ui
            .add_enabled(can_preview, egui::Button::new("Preview"))
            .clicked()
        {
            let image_url = form.image.trim().to_string();
            self.start_vendor_image_preview(&image_url);
        }
        ui.label("supportedCategories (JSON)");
        ui.add(
            egui::TextEdit::multiline(&mut form.supported_categories)
                .desired_rows(3)
                .desired_width(f32::INFINITY),
        );
        labeled_single_line(ui, "Address 1", &mut form.address1);
        labeled_single_line(ui, "Address 2", &mut form.address2);
        labeled_single_line(ui, "State", &mut form.state);
        labeled_single_line(ui, "Landmark", &mut form.landmark);
        labeled_single_line(ui, "Pincode", &mut form.pincode);
        labeled_single_line(ui, "Contact Name", &mut form.contact_name);
        labeled_single_line(ui, "Phone Number", &mut form.phone_number);
        labeled_single_line(ui, "Email", &mut form.email);

        ui.add_space(6.0);
        let saving = self.save_task.is_some();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!saving, egui::Button::new(save_label(form.id)))
                .clicked()
            {
                if form.name.trim().is_empty() {
                    self.status_line = "Vendor name is required.".to_string();
                } else {
                    let payload = vendor_payload(form);
                    let vendor_id = form.id;
                    let api = Arc::clone(&self.api);
                    self.save_task = Some((
                        Screen::Vendors,
                        spawn_task(move || {
                            let saved = match vendor_id {
                                None => api.create_vendor(&payload)?,
                                Some(id) => api.update_vendor(id, &payload)?,
                            };
                            Ok(format!("Vendor {} saved.", saved.name))
                        }),
                    ));
                }
            }
            if ui.button("Cancel").clicked() {
                keep_open = false;
            }
        });
        keep_open
    }

    fn show_products_screen(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        if let Some(mut form) = self.product_form.take() {
            let keep_open = self.show_product_form(ui, ctx, &mut form);
            if keep_open {
                self.product_form = Some(form);
            } else {
                self.product_media_receiver = None;
            }
            return;
        }

        let mut action = None;
        ui.horizontal(|ui| {
            ui.heading("Products");
            if ui.button("New Product").clicked() {
                action = Some(ListAction::New);
            }
        });
        if !self.products.loaded {
            ui.label("Loading products...");
            return;
        }

        let delete_busy = self.row_delete_task.is_some();
        let thumb_refs = self
            .products
            .rows
            .iter()
            .map(|product| product_thumb_ref(product).map(ToString::to_string))
            .collect::<Vec<_>>();
        let rows = self
            .products
            .rows
            .iter()
            .map(|product| {
                (
                    product.id,
                    product.name.clone(),
                    product.sku.clone(),
                    product.price,
                    product.vendor_id,
                )
            })
            .collect::<Vec<_>>();
        egui::Grid::new("products-table")
            .striped(true)
            .num_columns(7)
            .show(ui, |ui| {
                ui.strong("ID");
                ui.strong("Media");
                ui.strong("Name");
                ui.strong("SKU");
                ui.strong("Price");
                ui.strong("Vendor");
                ui.strong("");
                ui.end_row();
                for (row_index, (id, name, sku, price, vendor_id)) in rows.iter().enumerate() {
                    ui.label(id.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()));
                    match thumb_refs[row_index].as_deref() {
                        Some(reference) => {
                            self.draw_media_thumb(ui, ctx, reference, LIST_THUMB_MAX_SIZE)
                        }
                        None => {
                            ui.label("-");
                        }
                    }
                    ui.label(name);
                    ui.label(sku);
                    ui.label(format!("{price}"));
                    ui.label(vendor_id.to_string());
                    ui.horizontal(|ui| {
                        if ui.button("Edit").clicked() {
                            action = Some(ListAction::Edit(row_index));
                        }
                        if let Some(product_id) = id {
                            if ui
                                .add_enabled(!delete_busy, egui::Button::new("Delete"))
                                .clicked()
                            {
                                action = Some(ListAction::DeleteRow(*product_id));
                            }
                        }
                    });
                    ui.end_row();
                }
            });

        match action {
            Some(ListAction::New) => {
                self.product_form = Some(ProductFormState::default());
                self.start_vendor_options_load();
            }
            Some(ListAction::Edit(row_index)) => {
                if let Some(product) = self.products.rows.get(row_index) {
                    self.product_form = Some(product_form_from(product));
                    self.start_vendor_options_load();
                }
            }
            Some(ListAction::DeleteRow(product_id)) => {
                let api = Arc::clone(&self.api);
                self.row_delete_task = Some((
                    Screen::Products,
                    spawn_task(move || api.delete_product(product_id)),
                ));
            }
            None => {}
        }
    }

    fn show_product_form(
        &mut self,
        ui: &mut egui::Ui,
        ctx: &egui::Context,
        form: &mut ProductFormState,
    ) -> bool {
        let mut keep_open = true;
        match form.id {
            Some(id) => ui.heading(format!("Edit Product #{id}")),
            None => ui.heading("Create Product"),
        };
        ui.add_space(6.0);

        labeled_single_line(ui, "Name", &mut form.name);
        labeled_single_line(ui, "SKU", &mut form.sku);
        labeled_single_line(ui, "Price", &mut form.price);

        ui.horizontal(|ui| {
            ui.label("Vendor");
            let search_response = ui.add(
                egui::TextEdit::singleline(&mut form.vendor_search)
                    .hint_text("Type to search vendors"),
            );
            if search_response.changed() {
                self.vendor_search_edited_at = Some(Instant::now());
            }
            let selected_label = form
                .vendor_id
                .map(|vendor_id| {
                    self.vendor_options
                        .iter()
                        .find(|vendor| vendor.vendor_id == Some(vendor_id))
                        .map(|vendor| format!("{vendor_id} - {}", vendor.name))
                        .unwrap_or_else(|| format!("#{vendor_id}"))
                })
                .unwrap_or_else(|| "Select vendor".to_string());
            egui::ComboBox::from_id_salt("vendor-picker")
                .selected_text(selected_label)
                .show_ui(ui, |ui| {
                    for vendor in &self.vendor_options {
                        let Some(vendor_id) = vendor.vendor_id else {
                            continue;
                        };
                        let label = match vendor.email.as_deref() {
                            Some(email) => format!("{vendor_id} - {} ({email})", vendor.name),
                            None => format!("{vendor_id} - {}", vendor.name),
                        };
                        ui.selectable_value(&mut form.vendor_id, Some(vendor_id), label);
                    }
                });
        });

        ui.checkbox(&mut form.available, "Available");
        ui.label("categoryDetails (JSON)");
        ui.add(
            egui::TextEdit::multiline(&mut form.category_details)
                .desired_rows(4)
                .desired_width(f32::INFINITY),
        );
        ui.label("schedule (JSON)");
        ui.add(
            egui::TextEdit::multiline(&mut form.schedule)
                .desired_rows(4)
                .desired_width(f32::INFINITY),
        );

        ui.separator();
        ui.strong("Media");
        if form.id.is_none() {
            ui.label("Media URLs (one per line)");
            ui.add(
                egui::TextEdit::multiline(&mut form.media_urls)
                    .desired_rows(3)
                    .desired_width(f32::INFINITY)
                    .hint_text("https://...\nhttps://..."),
            );
        }

        let mut preview_clicked = false;
        ui.horizontal(|ui| {
            if ui.button("Add files...").clicked() {
                if let Some(paths) = rfd::FileDialog::new()
                    .add_filter("Media", MEDIA_FILE_EXTENSIONS)
                    .pick_files()
                {
                    form.local_files.extend(paths);
                }
            }
            let can_preview = self.preview_task.is_none()
                && (!form.media_urls.trim().is_empty()
                    || !form.persisted_media.is_empty()
                    || !form.local_files.is_empty());
            if ui
                .add_enabled(can_preview, egui::Button::new("Preview"))
                .clicked()
            {
                preview_clicked = true;
            }
        });
        if preview_clicked {
            self.start_product_preview(form);
        }

        let mut remove_file_index = None;
        for (file_index, file) in form.local_files.iter().enumerate() {
            ui.horizontal(|ui| {
                ui.label(file.display().to_string());
                if ui.small_button("x").clicked() {
                    remove_file_index = Some(file_index);
                }
            });
        }
        if let Some(file_index) = remove_file_index {
            form.local_files.remove(file_index);
        }

        if form.id.is_some() {
            self.show_persisted_media_strip(ui, ctx, form);
        }

        ui.add_space(6.0);
        let saving = self.save_task.is_some();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!saving, egui::Button::new(save_label(form.id)))
                .clicked()
            {
                match product_payload(form) {
                    Ok(payload) => {
                        let product_id = form.id;
                        let files = form.local_files.clone();
                        let api = Arc::clone(&self.api);
                        self.save_task = Some((
                            Screen::Products,
                            spawn_task(move || {
                                let saved = match product_id {
                                    None => api.create_product(&payload)?,
                                    Some(id) => api.update_product(id, &payload)?,
                                };
                                if let Some(saved_id) = saved.id.or(product_id) {
                                    for file in &files {
                                        api.upload_product_media(saved_id, file)?;
                                    }
                                }
                                Ok(format!("Product {} saved.", saved.name))
                            }),
                        ));
                    }
                    Err(message) => self.status_line = message,
                }
            }
            if ui.button("Cancel").clicked() {
                keep_open = false;
            }
        });
        keep_open
    }

    fn show_persisted_media_strip(
        &mut self,
        ui: &mut egui::Ui,
        ctx: &egui::Context,
        form: &mut ProductFormState,
    ) {
        let Some(product_id) = form.id else {
            return;
        };
        if !form.media_loaded {
            ui.label("Loading media...");
            return;
        }
        let delete_busy = self.media_delete.is_some();
        let mut delete_media_id = None;
        for media in &form.persisted_media {
            let media_url = media.media_url.clone();
            let media_type = media.media_type.clone();
            let media_id = media.id;
            ui.horizontal(|ui| {
                self.draw_media_thumb(ui, ctx, &media_url, MEDIA_STRIP_THUMB_MAX_SIZE);
                let media_type = media_type.as_deref().unwrap_or("IMAGE");
                ui.label(format!("{media_type} - {media_url}"));
                if ui
                    .add_enabled(!delete_busy, egui::Button::new("Delete"))
                    .clicked()
                {
                    delete_media_id = Some(media_id);
                }
            });
        }
        if let Some(media_id) = delete_media_id {
            self.start_media_delete(MediaDeleteSource::Strip, product_id, media_id);
        }
    }

    fn show_customers_screen(&mut self, ui: &mut egui::Ui) {
        if let Some(mut form) = self.customer_form.take() {
            let keep_open = self.show_customer_form(ui, &mut form);
            if keep_open {
                self.customer_form = Some(form);
            }
            return;
        }

        let mut action = None;
        ui.horizontal(|ui| {
            ui.heading("Customers");
            if ui.button("New Customer").clicked() {
                action = Some(ListAction::New);
            }
        });
        if !self.customers.loaded {
            ui.label("Loading customers...");
            return;
        }
        let delete_busy = self.row_delete_task.is_some();
        egui::Grid::new("customers-table")
            .striped(true)
            .num_columns(5)
            .show(ui, |ui| {
                ui.strong("ID");
                ui.strong("Name");
                ui.strong("Email");
                ui.strong("Phone");
                ui.strong("");
                ui.end_row();
                for (row_index, customer) in self.customers.rows.iter().enumerate() {
                    ui.label(
                        customer
                            .id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    );
                    ui.label(format!("{} {}", customer.first_name, customer.last_name));
                    ui.label(&customer.email);
                    ui.label(customer.phone.as_deref().unwrap_or("-"));
                    ui.horizontal(|ui| {
                        if ui.button("Edit").clicked() {
                            action = Some(ListAction::Edit(row_index));
                        }
                        if let Some(customer_id) = customer.id {
                            if ui
                                .add_enabled(!delete_busy, egui::Button::new("Delete"))
                                .clicked()
                            {
                                action = Some(ListAction::DeleteRow(customer_id));
                            }
                        }
                    });
                    ui.end_row();
                }
            });

        match action {
            Some(ListAction::New) => self.customer_form = Some(CustomerFormState::default()),
            Some(ListAction::Edit(row_index)) => {
                if let Some(customer) = self.customers.rows.get(row_index) {
                    self.customer_form = Some(customer_form_from(customer));
                }
            }
            Some(ListAction::DeleteRow(customer_id)) => {
                let api = Arc::clone(&self.api);
                self.row_delete_task = Some((
                    Screen::Customers,
                    spawn_task(move || api.delete_customer(customer_id)),
                ));
            }
            None => {}
        }
    }

    fn show_customer_form(&mut self, ui: &mut egui::Ui, form: &mut CustomerFormState) -> bool {
        let mut keep_open = true;
        match form.id {
            Some(id) => ui.heading(format!("Edit Customer #{id}")),
            None => ui.heading("Create Customer"),
        };
        ui.add_space(6.0);
        labeled_single_line(ui, "First Name", &mut form.first_name);
        labeled_single_line(ui, "Last Name", &mut form.last_name);
        labeled_single_line(ui, "Email", &mut form.email);
        labeled_single_line(ui, "Phone", &mut form.phone);

        ui.add_space(6.0);
        let saving = self.save_task.is_some();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!saving, egui::Button::new(save_label(form.id)))
                .clicked()
            {
                if form.first_name.trim().is_empty()
                    || form.last_name.trim().is_empty()
                    || form.email.trim().is_empty()
                {
                    self.status_line =
                        "First name, last name, and email are required.".to_string();
                } else {
                    let payload = Customer {
                        id: None,
                        first_name: form.first_name.trim().to_string(),
                        last_name: form.last_name.trim().to_string(),
                        email: form.email.trim().to_string(),
                        phone: blank_to_none(&form.phone),
                    };
                    let customer_id = form.id;
                    let api = Arc::clone(&self.api);
                    self.save_task = Some((
                        Screen::Customers,
                        spawn_task(move || {
                            let saved = match customer_id {
                                None => api.create_customer(&payload)?,
                                Some(id) => api.update_customer(id, &payload)?,
                            };
                            Ok(format!("Customer {} saved.", saved.email))
                        }),
                    ));
                }
            }
            if ui.button("Cancel").clicked() {
                keep_open = false;
            }
        });
        keep_open
    }

    fn show_cuisines_screen(&mut self, ui: &mut egui::Ui) {
        if let Some(mut form) = self.cuisine_form.take() {
            let keep_open = self.show_cuisine_form(ui, &mut form);
            if keep_open {
                self.cuisine_form = Some(form);
            }
            return;
        }

        let mut action = None;
        ui.horizontal(|ui| {
            ui.heading("Cuisines");
            if ui.button("New Cuisine").clicked() {
                action = Some(ListAction::New);
            }
        });
        if !self.cuisines.loaded {
            ui.label("Loading cuisines...");
            return;
        }
        let delete_busy = self.row_delete_task.is_some();
        egui::Grid::new("cuisines-table")
            .striped(true)
            .num_columns(5)
            .show(ui, |ui| {
                ui.strong("ID");
                ui.strong("Name");
                ui.strong("Category");
                ui.strong("Region");
                ui.strong("");
                ui.end_row();
                for (row_index, cuisine) in self.cuisines.rows.iter().enumerate() {
                    ui.label(
                        cuisine
                            .id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    );
                    ui.label(&cuisine.cuisine_name);
                    ui.label(cuisine.category.as_deref().unwrap_or("-"));
                    ui.label(cuisine.region.as_deref().unwrap_or("-"));
                    ui.horizontal(|ui| {
                        if ui.button("Edit").clicked() {
                            action = Some(ListAction::Edit(row_index));
                        }
                        if let Some(cuisine_id) = cuisine.id {
                            if ui
                                .add_enabled(!delete_busy, egui::Button::new("Delete"))
                                .clicked()
                            {
                                action = Some(ListAction::DeleteRow(cuisine_id));
                            }
                        }
                    });
                    ui.end_row();
                }
            });

        match action {
            Some(ListAction::New) => self.cuisine_form = Some(CuisineFormState::default()),
            Some(ListAction::Edit(row_index)) => {
                if let Some(cuisine) = self.cuisines.rows.get(row_index) {
                    self.cuisine_form = Some(cuisine_form_from(cuisine));
                }
            }
            Some(ListAction::DeleteRow(cuisine_id)) => {
                let api = Arc::clone(&self.api);
                self.row_delete_task = Some((
                    Screen::Cuisines,
                    spawn_task(move || api.delete_cuisine(cuisine_id)),
                ));
            }
            None => {}
        }
    }

    fn show_cuisine_form(&mut self, ui: &mut egui::Ui, form: &mut CuisineFormState) -> bool {
        let mut keep_open = true;
        match form.id {
            Some(id) => ui.heading(format!("Edit Cuisine #{id}")),
            None => ui.heading("Create Cuisine"),
        };
        ui.add_space(6.0);
        labeled_single_line(ui, "Cuisine Name", &mut form.cuisine_name);
        labeled_single_line(ui, "Category", &mut form.category);
        labeled_single_line(ui, "Subcategory", &mut form.subcategory);
        labeled_single_line(ui, "Region", &mut form.region);

        ui.add_space(6.0);
        let saving = self.save_task.is_some();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!saving, egui::Button::new(save_label(form.id)))
                .clicked()
            {
                if form.cuisine_name.trim().is_empty() {
                    self.status_line = "Cuisine name is required.".to_string();
                } else {
                    let payload = Cuisine {
                        id: None,
                        cuisine_name: form.cuisine_name.trim().to_string(),
                        category: blank_to_none(&form.category),
                        subcategory: blank_to_none(&form.subcategory),
                        region: blank_to_none(&form.region),
                    };
                    let cuisine_id = form.id;
                    let api = Arc::clone(&self.api);
                    self.save_task = Some((
                        Screen::Cuisines,
                        spawn_task(move || {
                            let saved = match cuisine_id {
                                None => api.create_cuisine(&payload)?,
                                Some(id) => api.update_cuisine(id, &payload)?,
                            };
                            Ok(format!("Cuisine {} saved.", saved.cuisine_name))
                        }),
                    ));
                }
            }
            if ui.button("Cancel").clicked() {
                keep_open = false;
            }
        });
        keep_open
    }

    fn show_gallery(&mut self, ctx: &egui::Context) {
        if self.gallery.is_none() {
            return;
        }

        // Keys are consumed only on frames where the gallery is open, so no
        // handler outlives it.
        let mut go_next = false;
        let mut go_previous = false;
        let mut close_requested = false;
        ctx.input_mut(|input| {
            go_next = input.consume_key(egui::Modifiers::NONE, egui::Key::ArrowRight);
            go_previous = input.consume_key(egui::Modifiers::NONE, egui::Key::ArrowLeft);
            close_requested = input.consume_key(egui::Modifiers::NONE, egui::Key::Escape);
        });

        let (total, position, current) = {
            let Some(gallery) = self.gallery.as_ref() else {
                return;
            };
            (
                gallery.len(),
                gallery.current_index(),
                gallery.current().cloned(),
            )
        };
        let origin = self.gallery_origin;
        let delete_in_flight =
            matches!(self.media_delete, Some((MediaDeleteSource::Gallery, _, _)));

        let texture = current.as_ref().and_then(|item| {
            if item.display_kind() == MediaKind::Image {
                self.ensure_media_texture(ctx, &item.url)
            } else {
                None
            }
        });

        let title = if total > 1 {
            format!("Preview {} / {total}", position + 1)
        } else {
            "Preview".to_string()
        };

        let mut copy_clicked = false;
        let mut open_clicked = false;
        let mut delete_clicked = false;
        egui::Window::new(title)
            .id(egui::Id::new("media-preview-gallery"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if let Some(item) = current.as_ref() {
                        if ui.button("Open original").clicked() {
                            open_clicked = true;
                        }
                        if ui.button("Copy link").clicked() {
                            copy_clicked = true;
                        }
                        let deletable = item.can_delete() || origin == GalleryOrigin::VendorImage;
                        if deletable
                            && ui
                                .add_enabled(!delete_in_flight, egui::Button::new("Delete"))
                                .clicked()
                        {
                            delete_clicked = true;
                        }
                    }
                    if ui.button("Close").clicked() {
                        close_requested = true;
                    }
                });
                ui.separator();

                match current.as_ref() {
                    Some(item) => {
                        ui.horizontal(|ui| {
                            if total > 1 && ui.button("<").clicked() {
                                go_previous = true;
                            }
                            match item.display_kind() {
                                MediaKind::Image => match texture.as_ref() {
                                    Some(texture) => {
                                        draw_scaled_texture(ui, texture, GALLERY_MEDIA_MAX_SIZE)
                                    }
                                    None => {
                                        ui.label("Loading media...");
                                    }
                                },
                                MediaKind::Video => {
                                    ui.label("Video preview. Use Open original to play.");
                                }
                            }
                            if total > 1 && ui.button(">").clicked() {
                                go_next = true;
                            }
                        });
                        if let Some(title) = item.title.as_deref() {
                            ui.label(title);
                        }
                        if let Some(caption) = media_caption(item) {
                            ui.label(egui::RichText::new(caption).weak());
                        }
                        ui.label(
                            egui::RichText::new(gallery::file_name_from_url(item.link_target()))
                                .weak(),
                        );
                    }
                    None => {
                        ui.label("Nothing to preview.");
                    }
                }
            });

        if let Some(item) = current.as_ref() {
            let link_target = self.api.absolute_url(item.link_target());
            if copy_clicked {
                // Best effort; clipboard failures surface nowhere.
                ctx.copy_text(link_target.clone());
            }
            if open_clicked {
                ctx.open_url(egui::OpenUrl::new_tab(gallery::cache_busted(&link_target)));
            }
            if delete_clicked {
                match origin {
                    GalleryOrigin::VendorImage => {
                        if let Some(form) = self.vendor_form.as_mut() {
                            form.image.clear();
                        }
                        close_requested = true;
                    }
                    GalleryOrigin::Product { product_id } => {
                        if let (Some(product_id), Some(media_id)) =
                            (product_id, item.delete_media_id)
                        {
                            self.start_media_delete(
                                MediaDeleteSource::Gallery,
                                product_id,
                                media_id,
                            );
                        }
                    }
                }
            }
        }

        if let Some(gallery) = self.gallery.as_mut() {
            if go_next {
                gallery.next();
            }
            if go_previous {
                gallery.previous();
            }
        }
        if close_requested {
            self.gallery = None;
        }
    }
}

impl eframe::App for SoukAdminApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        Self::apply_dark_visuals(ctx);
        self.poll_background_tasks();
        self.ensure_screen_data();
        self.tick_vendor_search_debounce(ctx);

        self.show_nav_bar(ctx);
        self.show_status_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .id_salt("screen-scroll")
                .show(ui, |ui| match self.screen {
                    Screen::Vendors => self.show_vendors_screen(ui),
                    Screen::Products => self.show_products_screen(ui, ctx),
                    Screen::Customers => self.show_customers_screen(ui),
                    Screen::Cuisines => self.show_cuisines_screen(ui),
                });
        });

        self.show_gallery(ctx);

        if self.is_loading() {
            ctx.set_cursor_icon(egui::CursorIcon::Progress);
            ctx.request_repaint_after(POLL_REPAINT_INTERVAL);
        }
    }
}

fn labeled_single_line(ui: &mut egui::Ui, label: &str, value: &mut String) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::TextEdit::singleline(value).desired_width(320.0));
    });
}

fn save_label(id: Option<i64>) -> &'static str {
    if id.is_none() {
        "Create"
    } else {
        "Save"
    }
}

fn draw_scaled_texture(ui: &mut egui::Ui, texture: &TextureHandle, max_size: f32) {
    let size = texture.size_vec2();
    if size.x <= 0.0 || size.y <= 0.0 {
        return;
    }
    let scale = (max_size / size.x).min(max_size / size.y).min(1.0);
    ui.image((texture.id(), size * scale));
}

fn media_caption(item: &PreviewItem) -> Option<String> {
    let size_text = item.size_bytes.map(gallery::human_size);
    match (item.mime_type.as_deref(), size_text) {
        (Some(mime), Some(size)) => Some(format!("{mime} - {size}")),
        (Some(mime), None) => Some(mime.to_string()),
        (None, Some(size)) => Some(size),
        (None, None) => None,
    }
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Free-form JSON text areas: blank and unparseable both map to None so a
/// typo never blocks a save.
fn parse_json_field(value: &str) -> Option<serde_json::Value> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::warn!("Ignoring unparseable JSON field: {err}");
            None
        }
    }
}

fn media_urls_payload(text: &str) -> Option<Vec<MediaRef>> {
    let urls = resolver::split_media_urls(text);
    if urls.is_empty() {
        return None;
    }
    Some(
        urls.into_iter()
            .map(|url| MediaRef {
                media_url: Some(url),
                ..MediaRef::default()
            })
            .collect(),
    )
}

fn product_thumb_ref(product: &Product) -> Option<&str> {
    let media = product.media.as_ref()?.first()?;
    media.url.as_deref().or(media.media_url.as_deref())
}

fn vendor_payload(form: &VendorFormState) -> Vendor {
    Vendor {
        vendor_id: None,
        name: form.name.trim().to_string(),
        supported_categories: parse_json_field(&form.supported_categories),
        image: blank_to_none(&form.image),
        address1: blank_to_none(&form.address1),
        address2: blank_to_none(&form.address2),
        state: blank_to_none(&form.state),
        landmark: blank_to_none(&form.landmark),
        pincode: blank_to_none(&form.pincode),
        contact_name: blank_to_none(&form.contact_name),
        phone_number: blank_to_none(&form.phone_number),
        email: blank_to_none(&form.email),
    }
}

fn product_payload(form: &ProductFormState) -> Result<Product, String> {
    if form.name.trim().is_empty() || form.sku.trim().is_empty() {
        return Err("Product name and SKU are required.".to_string());
    }
    let price = form
        .price
        .trim()
        .parse::<f64>()
        .map_err(|_| "Price must be a number.".to_string())?;
    if !price.is_finite() || price < 0.0 {
        return Err("Price must be a non-negative number.".to_string());
    }
    let Some(vendor_id) = form.vendor_id else {
        return Err("Select a vendor.".to_string());
    };
    let media = if form.id.is_none() {
        media_urls_payload(&form.media_urls)
    } else {
        None
    };
    Ok(Product {
        id: None,
        name: form.name.trim().to_string(),
        sku: form.sku.trim().to_string(),
        price,
        vendor_id,
        available: Some(form.available),
        category_details: parse_json_field(&form.category_details),
        schedule: parse_json_field(&form.schedule),
        media,
    })
}

fn vendor_form_from(vendor: &Vendor) -> VendorFormState {
    VendorFormState {
        id: vendor.vendor_id,
        name: vendor.name.clone(),
        image: vendor.image.clone().unwrap_or_default(),
        supported_categories: vendor
            .supported_categories
            .as_ref()
            .and_then(|value| serde_json::to_string_pretty(value).ok())
            .unwrap_or_default(),
        address1: vendor.address1.clone().unwrap_or_default(),
        address2: vendor.address2.clone().unwrap_or_default(),
        state: vendor.state.clone().unwrap_or_default(),
        landmark: vendor.landmark.clone().unwrap_or_default(),
        pincode: vendor.pincode.clone().unwrap_or_default(),
        contact_name: vendor.contact_name.clone().unwrap_or_default(),
        phone_number: vendor.phone_number.clone().unwrap_or_default(),
        email: vendor.email.clone().unwrap_or_default(),
    }
}

fn product_form_from(product: &Product) -> ProductFormState {
    ProductFormState {
        id: product.id,
        name: product.name.clone(),
        sku: product.sku.clone(),
        price: product.price.to_string(),
        vendor_id: Some(product.vendor_id),
        available: product.available.unwrap_or(true),
        category_details: product
            .category_details
            .as_ref()
            .and_then(|value| serde_json::to_string_pretty(value).ok())
            .unwrap_or_default(),
        schedule: product
            .schedule
            .as_ref()
            .and_then(|value| serde_json::to_string_pretty(value).ok())
            .unwrap_or_default(),
        ..ProductFormState::default()
    }
}

fn customer_form_from(customer: &Customer) -> CustomerFormState {
    CustomerFormState {
        id: customer.id,
        first_name: customer.first_name.clone(),
        last_name: customer.last_name.clone(),
        email: customer.email.clone(),
        phone: customer.phone.clone().unwrap_or_default(),
    }
}

fn cuisine_form_from(cuisine: &Cuisine) -> CuisineFormState {
    CuisineFormState {
        id: cuisine.id,
        cuisine_name: cuisine.cuisine_name.clone(),
        category: cuisine.category.clone().unwrap_or_default(),
        subcategory: cuisine.subcategory.clone().unwrap_or_default(),
        region: cuisine.region.clone().unwrap_or_default(),
    }
}

fn load_media_bytes(api: &ApiClient, target: &str) -> Result<Vec<u8>> {
    if target.starts_with("http://") || target.starts_with("https://") {
        api.download_bytes(&gallery::cache_busted(target))
    } else {
        fs::read(target).with_context(|| format!("Could not read local media file {target}"))
    }
}

fn decode_color_image(bytes: &[u8]) -> Result<ColorImage> {
    let decoded = image::load_from_memory(bytes).context("Could not decode media bytes")?;
    let rgba = decoded.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_to_none_trims_and_drops_empty() {
        assert_eq!(blank_to_none("  "), None);
        assert_eq!(blank_to_none(" x "), Some("x".to_string()));
    }

    #[test]
    fn parse_json_field_handles_blank_invalid_and_valid_input() {
        assert_eq!(parse_json_field(""), None);
        assert_eq!(parse_json_field("   "), None);
        assert_eq!(parse_json_field("{not json"), None);
        assert_eq!(
            parse_json_field(r#"{"spicy":true}"#),
            Some(serde_json::json!({"spicy": true}))
        );
    }

    #[test]
    fn media_urls_payload_maps_lines_to_media_refs() {
        assert_eq!(media_urls_payload("\n  \n"), None);
        let refs = media_urls_payload("https://a\nhttps://b\n").expect("refs expected");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].media_url.as_deref(), Some("https://a"));
        assert!(refs[0].url.is_none());
    }

    #[test]
    fn product_payload_validates_required_fields() {
        let mut form = ProductFormState {
            name: "Dosa".to_string(),
            sku: "DOSA-1".to_string(),
            price: "4.5".to_string(),
            vendor_id: Some(3),
            media_urls: "https://cdn/x.png".to_string(),
            ..ProductFormState::default()
        };
        let payload = product_payload(&form).expect("payload should build");
        assert_eq!(payload.vendor_id, 3);
        assert_eq!(payload.available, Some(true));
        assert_eq!(payload.media.as_ref().map(Vec::len), Some(1));

        form.price = "free".to_string();
        assert!(product_payload(&form).is_err());
        form.price = "-1".to_string();
        assert!(product_payload(&form).is_err());
        form.price = "1".to_string();
        form.vendor_id = None;
        assert!(product_payload(&form).is_err());
    }

    #[test]
    fn product_payload_rejects_non_finite_price() {
        let mut form = ProductFormState {
            name: "Dosa".to_string(),
            sku: "DOSA-1".to_string(),
            price: "NaN".to_string(),
            vendor_id: Some(3),
            ..ProductFormState::default()
        };
        assert!(product_payload(&form).is_err());
        form.price = "inf".to_string();
        assert!(product_payload(&form).is_err());
        form.price = "-inf".to_string();
        assert!(product_payload(&form).is_err());
    }

    #[test]
    fn pending_texture_load_counts_as_loading() {
        let api = ApiClient::new("http://localhost:8080").expect("client should build");
        let mut app = SoukAdminApp::new(api);
        assert!(!app.is_loading());

        let (_tx, rx) = mpsc::channel::<Result<ColorImage, String>>();
        app.media_textures.insert(
            "http://localhost:8080/uploads/p.png".to_string(),
            MediaTexture::Loading(rx),
        );
        assert!(app.is_loading());
    }

    #[test]
    fn product_payload_omits_media_urls_in_edit_mode() {
        let form = ProductFormState {
            id: Some(9),
            name: "Dosa".to_string(),
            sku: "DOSA-1".to_string(),
            price: "4.5".to_string(),
            vendor_id: Some(3),
            media_urls: "https://cdn/x.png".to_string(),
            ..ProductFormState::default()
        };
        let payload = product_payload(&form).expect("payload should build");
        assert!(payload.media.is_none());
    }

    #[test]
    fn product_thumb_ref_prefers_url_over_media_url() {
        let mut product = Product {
            name: "Dosa".to_string(),
            sku: "DOSA-1".to_string(),
            price: 4.5,
            vendor_id: 3,
            ..Product::default()
        };
        assert!(product_thumb_ref(&product).is_none());

        product.media = Some(vec![MediaRef {
            media_url: Some("/uploads/m.png".to_string()),
            url: Some("/uploads/u.png".to_string()),
            ..MediaRef::default()
        }]);
        assert_eq!(product_thumb_ref(&product), Some("/uploads/u.png"));
    }

    #[test]
    fn media_caption_joins_mime_and_size() {
        let mut item = PreviewItem::from_url("https://x.com/a.png");
        assert_eq!(media_caption(&item), None);
        item.mime_type = Some("image/png".to_string());
        assert_eq!(media_caption(&item).as_deref(), Some("image/png"));
        item.size_bytes = Some(2048);
        assert_eq!(media_caption(&item).as_deref(), Some("image/png - 2.0 KB"));
    }

    #[test]
    fn list_state_poll_keeps_pending_receiver() {
        let mut list = ListState::<Vendor>::default();
        assert!(list.needs_fetch());

        let (tx, rx) = mpsc::channel::<Result<Vec<Vendor>, String>>();
        list.receiver = Some(rx);
        assert!(!list.needs_fetch());

        let mut status = String::new();
        list.poll(&mut status, "vendors");
        assert!(list.receiver.is_some(), "empty channel should stay pending");

        tx.send(Ok(vec![Vendor {
            vendor_id: Some(1),
            name: "Spice Cart".to_string(),
            ..Vendor::default()
        }]))
        .expect("send should succeed");
        list.poll(&mut status, "vendors");
        assert!(list.loaded);
        assert_eq!(list.rows.len(), 1);
        assert!(status.is_empty());
    }
}
