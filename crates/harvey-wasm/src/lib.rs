use std::rc::Rc;

use harvey_engine::{
    ChatApi, ChannelTransport, Command, CommandSender, EngineConfig, SessionController,
    TranscriptView, UploadRequest,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Event, File, HtmlElement, HtmlInputElement, KeyboardEvent, Window};

mod api;
mod dom;
mod markdown;
mod socket;
mod utils;
mod view;

pub use api::FetchApi;
pub use socket::BrowserSocket;
pub use view::{DomView, PageElements};

/// Initialize the WASM application
/// This sets up panic hooks and logging
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Harvey chat WASM initialized");
}

/// Start the chat page: wire the page controls to the session engine,
/// connect the chat channel and load the conversation list.
#[wasm_bindgen]
pub async fn init_chat(csrf_token: Option<String>, username: Option<String>) -> Result<(), JsValue> {
    let document = document()?;
    let elements = view::PageElements::find(&document)?;
    let chat_box = elements.chat_box.clone();
    let user_input = elements.user_input.clone();

    let view = Rc::new(DomView::new(document.clone(), elements, username));
    let api: Rc<dyn ChatApi> = Rc::new(FetchApi::new(csrf_token));
    let transport: Rc<dyn ChannelTransport> = Rc::new(BrowserSocket::new(utils::build_ws_url()?));

    let mut controller = SessionController::new(
        api,
        transport,
        Rc::clone(&view) as Rc<dyn TranscriptView>,
        EngineConfig::default(),
    );
    let commands = controller.commands();
    view.bind(commands.clone());

    bind_composer(&document, &user_input, &commands)?;
    bind_history_scroll(&chat_box, &commands)?;
    bind_upload(&document, &commands)?;
    if let Some(button) = document.get_element_by_id("new-chat-btn") {
        let commands = commands.clone();
        dom::add_listener(&button, "click", move |_| {
            commands.send(Command::StartNew);
        })?;
    }

    controller
        .boot()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    wasm_bindgen_futures::spawn_local(controller.run());
    Ok(())
}

fn bind_composer(
    document: &Document,
    input: &HtmlInputElement,
    commands: &CommandSender,
) -> Result<(), JsValue> {
    let send_button = dom::get_element_by_id(document, "send-btn")?;
    {
        let input = input.clone();
        let commands = commands.clone();
        dom::add_listener(&send_button, "click", move |_| {
            commands.send(Command::Send(input.value()));
        })?;
    }

    let field = input.clone();
    let commands = commands.clone();
    dom::add_listener(input, "keydown", move |event: Event| {
        let Some(key) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        if key.key() == "Enter" && !key.shift_key() {
            event.prevent_default();
            commands.send(Command::Send(field.value()));
        }
    })
}

fn bind_history_scroll(chat_box: &HtmlElement, commands: &CommandSender) -> Result<(), JsValue> {
    let target = chat_box.clone();
    let commands = commands.clone();
    dom::add_listener(chat_box, "scroll", move |_| {
        if target.scroll_top() == 0 {
            commands.send(Command::LoadOlder);
        }
    })
}

fn bind_upload(document: &Document, commands: &CommandSender) -> Result<(), JsValue> {
    let (Some(button), Some(picker)) = (
        document.get_element_by_id("upload-btn"),
        document.get_element_by_id("resume-upload"),
    ) else {
        log::debug!("No upload controls on this page");
        return Ok(());
    };
    let picker: HtmlInputElement = picker
        .dyn_into()
        .map_err(|_| JsValue::from_str("Element is not HtmlInputElement: resume-upload"))?;

    {
        let picker = picker.clone();
        dom::add_listener(&button, "click", move |_| picker.click())?;
    }

    let source = picker.clone();
    let commands = commands.clone();
    dom::add_listener(&picker, "change", move |_| {
        let Some(files) = source.files() else {
            return;
        };
        for index in 0..files.length() {
            if let Some(file) = files.get(index) {
                let commands = commands.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    match read_file(&file).await {
                        Ok(upload) => {
                            commands.send(Command::Attach(upload));
                        }
                        Err(e) => log::error!("Failed to read {}: {:?}", file.name(), e),
                    }
                });
            }
        }
        source.set_value("");
    })
}

async fn read_file(file: &File) -> Result<UploadRequest, JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    Ok(UploadRequest::new(file.name(), bytes))
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))
}

fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("No document object"))
}
