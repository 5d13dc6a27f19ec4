mod layout;
mod widgets;

pub use layout::render;
pub use widgets::{
    render_add_form,
    render_calendar,
    render_day_summary,
    render_delete_confirmation,
    render_edit_form,
    render_header,
    render_help_screen,
    render_search_bar,
    render_status_bar,
    render_task_list,
};
