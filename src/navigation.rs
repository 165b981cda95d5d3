//! The navigation bar shown on every signed-in page.

use maud::{Markup, html};

use crate::{endpoints, session::Session};

/// Template for a link in the navigation bar.
///
/// It will change appearance if `is_current` is set to `true`. Only one link
/// should be set as active at any one time.
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

impl Link<'_> {
    fn into_html(self) -> Markup {
        let style = if self.is_current {
            "block py-2 px-3 text-white bg-blue-700 rounded-sm lg:bg-transparent
        lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500"
        } else {
            "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100
        lg:hover:bg-transparent lg:border-0 lg:hover:text-blue-700 lg:p-0
        dark:text-white lg:dark:hover:text-blue-500 dark:hover:bg-gray-700
        dark:hover:text-white lg:dark:hover:bg-transparent"
        };

        html!( a href=(self.url) class=(style) { (self.title) } )
    }
}

/// The navigation bar with the app title, section links, the signed-in
/// user's profile, and the sign-out link.
pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
    session: &'a Session,
}

impl<'a> NavBar<'a> {
    /// Get the navigation bar for `session`.
    ///
    /// If a link matches `active_endpoint`, then that link will be marked as
    /// active and displayed differently in the HTML.
    pub fn new(active_endpoint: &str, session: &'a Session) -> NavBar<'a> {
        let links = vec![
            Link {
                url: endpoints::DASHBOARD_VIEW,
                title: "Overview",
                is_current: active_endpoint == endpoints::DASHBOARD_VIEW,
            },
            Link {
                url: endpoints::INCOME_VIEW,
                title: "Income",
                is_current: active_endpoint == endpoints::INCOME_VIEW,
            },
            Link {
                url: endpoints::EXPENSE_VIEW,
                title: "Expenses",
                is_current: active_endpoint == endpoints::EXPENSE_VIEW,
            },
        ];

        NavBar { links, session }
    }

    /// Render the navigation bar.
    pub fn into_html(self) -> Markup {
        html! {
            nav class="bg-white border-gray-200 dark:bg-gray-800 shadow-sm"
            {
                div class="max-w-5xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href=(endpoints::DASHBOARD_VIEW)
                        class="text-xl font-bold text-blue-600 dark:text-blue-400"
                    {
                        "Fintrack"
                    }

                    div class="flex items-center gap-6"
                    {
                        @for link in self.links {
                            (link.into_html())
                        }
                    }

                    div class="flex items-center gap-3"
                    {
                        @if let Some(photo_url) = &self.session.photo_url {
                            img
                                src=(photo_url)
                                alt="Profile"
                                class="w-8 h-8 rounded-full object-cover";
                        }

                        span class="text-sm font-semibold text-gray-900 dark:text-white"
                        {
                            (self.session.display_name)
                        }

                        a
                            href=(endpoints::LOG_OUT)
                            class="text-sm text-gray-500 hover:text-blue-700 \
                                dark:text-gray-400 dark:hover:text-blue-400"
                        {
                            "Sign out"
                        }
                    }
                }
            }
        }
    }
}
