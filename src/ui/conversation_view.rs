use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use chrono::Utc;
use converse::screen::{Bubble, ScreenView};
use converse::storage::KeyValueStore;
use converse::{ApiClient, ConversationScreen, MessageTransport, SubmitError};
use gtk4 as gtk;
use gtk4::prelude::*;

const PLACEHOLDER: &str = "Write your message here";

type Screen = ConversationScreen<Box<dyn KeyValueStore>>;

/// The conversation screen: identity header, message history, draft input.
pub struct ConversationView {
    root: gtk::Box,
    history: gtk::Box,
    input: gtk::TextView,
    placeholder: gtk::Label,
    send_btn: gtk::Button,
    error_label: gtk::Label,
    profile: gtk::Label,
    screen: RefCell<Screen>,
    client: Option<Arc<ApiClient>>,
    toasts: adw::ToastOverlay,
}

impl ConversationView {
    pub fn new(
        screen: Screen,
        client: Option<Arc<ApiClient>>,
        banner: &str,
        toasts: adw::ToastOverlay,
    ) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let profile = gtk::Label::new(None);
        profile.add_css_class("heading");
        profile.set_halign(gtk::Align::Start);
        root.append(&profile);

        let title = gtk::Label::new(Some(banner));
        title.add_css_class("title-2");
        title.set_wrap(true);
        title.set_halign(gtk::Align::Start);
        root.append(&title);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let history = gtk::Box::new(gtk::Orientation::Vertical, 6);
        scroller.set_child(Some(&history));
        root.append(&scroller);

        // Input form
        let form = gtk::Box::new(gtk::Orientation::Vertical, 6);
        let input = gtk::TextView::builder()
            .wrap_mode(gtk::WrapMode::WordChar)
            .accepts_tab(false)
            .height_request(72)
            .build();
        input.add_css_class("card");
        input.update_property(&[gtk::accessible::Property::Placeholder(PLACEHOLDER)]);
        // TextView draws no placeholder of its own
        let placeholder = gtk::Label::new(Some(PLACEHOLDER));
        placeholder.add_css_class("dim-label");
        placeholder.set_halign(gtk::Align::Start);
        placeholder.set_valign(gtk::Align::Start);
        placeholder.set_margin_top(6);
        placeholder.set_margin_start(8);
        placeholder.set_can_target(false);
        let input_area = gtk::Overlay::new();
        input_area.set_child(Some(&input));
        input_area.add_overlay(&placeholder);
        let send_btn = gtk::Button::with_label(converse::screen::SEND_LABEL);
        send_btn.add_css_class("suggested-action");
        send_btn.set_halign(gtk::Align::End);
        let error_label = gtk::Label::new(None);
        error_label.add_css_class("error");
        error_label.set_halign(gtk::Align::Start);
        error_label.set_visible(false);
        form.append(&input_area);
        form.append(&send_btn);
        form.append(&error_label);
        root.append(&form);

        let view = Rc::new(Self {
            root,
            history,
            input,
            placeholder,
            send_btn,
            error_label,
            profile,
            screen: RefCell::new(screen),
            client,
            toasts,
        });
        view.connect_signals();
        view.refresh();
        view
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn phone_number(&self) -> String {
        self.screen.borrow().phone_number().to_string()
    }

    fn connect_signals(self: &Rc<Self>) {
        {
            let this = Rc::downgrade(self);
            self.input.buffer().connect_changed(move |buffer| {
                if let Some(view) = this.upgrade() {
                    let text = buffer.text(&buffer.start_iter(), &buffer.end_iter(), false);
                    view.placeholder.set_visible(text.is_empty());
                    view.screen.borrow_mut().set_draft(text.as_str());
                }
            });
        }
        {
            let this = Rc::downgrade(self);
            self.send_btn.connect_clicked(move |_| submit(&this));
        }
        // Ctrl+Enter submits, plain Enter inserts a newline
        {
            let this = Rc::downgrade(self);
            let keys = gtk::EventControllerKey::new();
            keys.connect_key_pressed(move |_, key, _, state| {
                let is_enter = key == gtk::gdk::Key::Return || key == gtk::gdk::Key::KP_Enter;
                if is_enter && state.contains(gtk::gdk::ModifierType::CONTROL_MASK) {
                    submit(&this);
                    gtk::glib::Propagation::Stop
                } else {
                    gtk::glib::Propagation::Proceed
                }
            });
            self.input.add_controller(keys);
        }
    }

    fn report_store_error(&self) {
        let failure = self.screen.borrow_mut().take_store_error();
        if let Some(e) = failure {
            log::error!("Conversation not saved: {e}");
            self.toasts.add_toast(adw::Toast::new("Couldn't save this conversation on this device."));
        }
    }

    fn refresh(&self) {
        let view = self.screen.borrow().view();
        self.render(&view);
    }

    fn render(&self, view: &ScreenView) {
        self.profile.set_label(&view.profile_line);

        while let Some(child) = self.history.first_child() {
            self.history.remove(&child);
        }
        if let Some(greeting) = &view.greeting {
            self.history.append(&bubble(greeting, "received-bubble", gtk::Align::Start));
        }
        for thread in &view.threads {
            let group = gtk::Box::new(gtk::Orientation::Vertical, 4);
            group.add_css_class("conversation");
            for reply in &thread.replies {
                group.append(&bubble(reply, "received-bubble", gtk::Align::Start));
            }
            group.append(&bubble(&thread.sent, "sent-bubble", gtk::Align::End));
            self.history.append(&group);
        }

        let buffer = self.input.buffer();
        let current = buffer.text(&buffer.start_iter(), &buffer.end_iter(), false);
        if current.as_str() != view.draft {
            buffer.set_text(&view.draft);
        }
        self.placeholder.set_visible(view.show_placeholder);

        self.send_btn.set_label(view.send_label);
        self.send_btn.set_sensitive(view.send_enabled);

        match &view.error {
            Some(message) => {
                self.error_label.set_label(message);
                self.error_label.set_visible(true);
            }
            None => self.error_label.set_visible(false),
        }
    }
}

fn bubble(content: &Bubble, class: &str, align: gtk::Align) -> gtk::Widget {
    let frame = gtk::Box::new(gtk::Orientation::Vertical, 2);
    frame.add_css_class(class);
    frame.set_halign(align);

    let text = gtk::Label::new(Some(&content.text));
    text.set_wrap(true);
    text.set_selectable(true);
    text.set_xalign(0.0);
    frame.append(&text);

    let time = gtk::Label::new(Some(&content.timestamp));
    time.add_css_class("caption");
    time.add_css_class("dim-label");
    time.set_xalign(0.0);
    frame.append(&time);

    frame.upcast()
}

fn submit(this: &Weak<ConversationView>) {
    let Some(view) = this.upgrade() else { return };
    let Some(pending) = view.screen.borrow_mut().begin_submit() else {
        return;
    };
    view.refresh();

    let payload = pending.payload().clone();
    let client = view.client.clone();
    let rx = crate::utils::run_async_to_main(async move {
        match client {
            Some(client) => client.send(&payload).await,
            None => Err(SubmitError::Network("no message endpoint configured".into())),
        }
    });

    let this = this.clone();
    let mut pending = Some(pending);
    rx.attach(None, move |res| {
        if let (Some(view), Some(pending)) = (this.upgrade(), pending.take()) {
            view.screen.borrow_mut().finish_submit(pending, res, Utc::now());
            view.refresh();
            view.report_store_error();
        }
        glib::ControlFlow::Break
    });
}
