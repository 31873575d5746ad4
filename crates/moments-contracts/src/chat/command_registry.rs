#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "provider",
        action: "set_provider",
    },
    CommandSpec {
        command: "restore",
        action: "restore_history",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "upload",
        action: "upload_image",
    },
    CommandSpec {
        command: "save",
        action: "save_image",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "image",
        action: "generate_image",
    },
    CommandSpec {
        command: "generate",
        action: "generate_image",
    },
    CommandSpec {
        command: "text",
        action: "generate_text",
    },
    CommandSpec {
        command: "clear",
        action: "clear_upload",
    },
    CommandSpec {
        command: "history",
        action: "list_history",
    },
    CommandSpec {
        command: "status",
        action: "show_status",
    },
    CommandSpec {
        command: "copy",
        action: "copy_text",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/image",
    "/upload",
    "/clear",
    "/text",
    "/history",
    "/restore",
    "/provider",
    "/status",
    "/copy",
    "/save",
    "/help",
    "/quit",
];
