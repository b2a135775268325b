use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::menus;
use crate::models::{NewEvent, TransferLeg};
use crate::transport::{PhotoAttachment, ReplyKeyboard};
use crate::utils::format::{format_date, parse_date};
use crate::utils::sanitize::sanitize_input;

/// The transport truncates image captions; posts and descriptions past this
/// length are re-prompted instead of stored.
pub const CAPTION_LIMIT: usize = 1024 - 200;
pub const TITLE_LIMIT: usize = 100;
/// One major currency unit, in minor units.
pub const MIN_PRICE: i64 = 100;

/// Stages of the authoring conversation. The manual path runs top to
/// bottom; TitleFromPost/ParseFromPost is the single-message fast path that
/// rejoins the manual path at Price (or falls back at Date).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Title,
    Date,
    EndLocation,
    Description,
    Price,
    Photo,
    TransferOption,
    StartLocation,
    TransferTime,
    TransferPrice,
    TitleFromPost,
    ParseFromPost,
}

/// Fields collected so far. Each stage fills exactly one slot, except
/// ParseFromPost which fills date, end_location and description at once.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub title: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub end_location: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub image_path: Option<String>,
    pub start_location: Option<String>,
    pub transfer_time: Option<NaiveDateTime>,
    pub transfer_price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: ReplyKeyboard,
}

impl Reply {
    fn wizard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: menus::wizard_keyboard(),
        }
    }

    fn entry(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: menus::wizard_keyboard_no_back(),
        }
    }

    fn menu(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: menus::main_keyboard(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum WizardInput<'a> {
    Text(&'a str),
    Photo(&'a PhotoAttachment),
}

/// Ambient inputs a transition may need: the clock feeds example prompts,
/// the media directory anchors derived asset paths.
pub struct StepContext<'a> {
    pub now: NaiveDateTime,
    pub media_dir: &'a Path,
}

#[derive(Debug)]
pub enum StepOutcome {
    /// Stay in place or advance; the reply prompts for the next input.
    Continue(Reply),
    /// The photo step completed; the dispatcher fetches the asset bytes,
    /// then forwards the reply.
    FetchPhoto {
        file_id: String,
        dest: PathBuf,
        reply: Reply,
    },
    /// Every field is collected; the dispatcher persists and reports the
    /// new identifier. Irreversible: the conversation is over.
    Commit(Box<NewEvent>),
    /// The draft is discarded and control returns to the top-level menu.
    Cancelled(Reply),
}

const MSG_CANCELLED: &str = "Conversazione annullata.";
const PROMPT_TITLE: &str = "Aggiungiamo un nuovo evento. Qual'è il nome dell'evento?";
const PROMPT_TITLE_FROM_POST: &str = "Stai aggiungendo da un post. Qual'è il nome dell'evento?";
const MSG_TITLE_TOO_LONG: &str =
    "Il titolo è troppo lungo. Per favore, usa meno di 100 caratteri.";
const PROMPT_POST: &str = "Perfetto. Ora invia un post da cui prenderò le informazioni \
     sull'evento con questo formato:\n\ndata in formato dd/mm/yyyy hh:mm\n\nlocation / \
     locale\n\ndescrizione";
const MSG_POST_TOO_LONG: &str = "Il post è troppo lungo. Per favore, usa meno caratteri.";
const MSG_DESCRIPTION_TOO_LONG: &str = "Le didascalie delle immagini hanno un limite di 1024 \
     caratteri.\nLa descrizione che hai mandato potrebbe superare il limite, rimanda il post \
     dell'evento accorciando la descrizione.";
const PROMPT_END_LOCATION: &str = "Qual'è la location / il locale dell'evento?";
const PROMPT_DESCRIPTION: &str = "Ottimo! Ora fornisci una descrizione per l'evento";
const PROMPT_PRICE: &str = "Quanto costa un biglietto? (in centesimi)";
const MSG_PRICE_INVALID: &str =
    "Inserisci un numero per il costo del biglietto (in centesimi)\nValore minimo un euro";
const PROMPT_PHOTO: &str = "Ora manda la locandina dell'evento!";
const PROMPT_TRANSFER_OPTION: &str = "Vuoi aggiungere una navetta per l'evento? (yes/no)";
const MSG_YES_NO: &str = "Non chiaro, rispondi yes/no";
const PROMPT_START_LOCATION: &str = "Da dove parte il transfer?";
const PROMPT_TRANSFER_PRICE: &str =
    "Ottimo! Ora fornisci il prezzo del transfer (in centesimi)";
const MSG_TRANSFER_PRICE_INVALID: &str = "Inserisci un numero valido per il costo del transfer \
     (in centesimi).\nValore minimo un euro";

fn date_prompt(now: NaiveDateTime) -> String {
    format!(
        "Ottimo! Ora, inserisci la data e l'ora dell'evento (formato: DD/MM/YYYY HH:MM)\nEsempio:\n{}",
        format_date(now)
    )
}

fn date_error_prompt(now: NaiveDateTime) -> String {
    format!("Il formato non è corretto.\nEsempio:\n{}", format_date(now))
}

fn post_fallback_prompt(now: NaiveDateTime) -> String {
    format!(
        "Il formato non è corretto, si passa all'inserimento manuale\nOra, inserisci la data e \
         l'ora dell'evento (formato: DD/MM/YYYY HH:MM)\nEsempio:\n{}",
        format_date(now)
    )
}

fn transfer_time_prompt(now: NaiveDateTime) -> String {
    format!(
        "Qual'è l'orario di partenza? (formato: DD/MM/YYYY HH:MM)\nEsempio:\n{}",
        format_date(now)
    )
}

/// One user's active authoring conversation. `step` is the single
/// transition function: cancel and back are resolved here once, everything
/// else dispatches on the current stage.
#[derive(Debug)]
pub struct Conversation {
    stage: Stage,
    draft: EventDraft,
}

impl Conversation {
    pub fn manual() -> (Self, Reply) {
        (
            Self {
                stage: Stage::Title,
                draft: EventDraft::default(),
            },
            Reply::entry(PROMPT_TITLE),
        )
    }

    pub fn from_post() -> (Self, Reply) {
        (
            Self {
                stage: Stage::TitleFromPost,
                draft: EventDraft::default(),
            },
            Reply::entry(PROMPT_TITLE_FROM_POST),
        )
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn draft(&self) -> &EventDraft {
        &self.draft
    }

    pub fn step(&mut self, input: WizardInput<'_>, ctx: &StepContext<'_>) -> StepOutcome {
        if let WizardInput::Text(text) = input {
            if text == menus::CANCEL {
                return StepOutcome::Cancelled(Reply::menu(MSG_CANCELLED));
            }
            if text == menus::BACK {
                return self.step_back(ctx.now);
            }
        }
        match self.stage {
            Stage::Title => self.on_title(input, ctx.now),
            Stage::Date => self.on_date(input, ctx.now),
            Stage::EndLocation => self.on_end_location(input),
            Stage::Description => self.on_description(input),
            Stage::Price => self.on_price(input),
            Stage::Photo => self.on_photo(input, ctx.media_dir),
            Stage::TransferOption => self.on_transfer_option(input),
            Stage::StartLocation => self.on_start_location(input, ctx.now),
            Stage::TransferTime => self.on_transfer_time(input, ctx.now),
            Stage::TransferPrice => self.on_transfer_price(input),
            Stage::TitleFromPost => self.on_title_from_post(input),
            Stage::ParseFromPost => self.on_parse_from_post(input, ctx.now),
        }
    }

    /// Move to the immediately preceding stage of the active path, keeping
    /// every collected field. Entry stages re-prompt in place.
    fn step_back(&mut self, now: NaiveDateTime) -> StepOutcome {
        let (stage, reply) = match self.stage {
            Stage::Title => (Stage::Title, Reply::entry(PROMPT_TITLE)),
            Stage::TitleFromPost => (Stage::TitleFromPost, Reply::entry(PROMPT_TITLE_FROM_POST)),
            Stage::Date => (Stage::Title, Reply::entry(PROMPT_TITLE)),
            Stage::EndLocation => (Stage::Date, Reply::wizard(date_prompt(now))),
            Stage::Description => (Stage::EndLocation, Reply::wizard(PROMPT_END_LOCATION)),
            Stage::Price => (Stage::Description, Reply::wizard(PROMPT_DESCRIPTION)),
            Stage::Photo => (Stage::Price, Reply::wizard(PROMPT_PRICE)),
            Stage::TransferOption => (Stage::Photo, Reply::wizard(PROMPT_PHOTO)),
            Stage::StartLocation => {
                (Stage::TransferOption, Reply::wizard(PROMPT_TRANSFER_OPTION))
            }
            Stage::TransferTime => (Stage::StartLocation, Reply::wizard(PROMPT_START_LOCATION)),
            Stage::TransferPrice => {
                (Stage::TransferTime, Reply::wizard(transfer_time_prompt(now)))
            }
            Stage::ParseFromPost => {
                (Stage::TitleFromPost, Reply::entry(PROMPT_TITLE_FROM_POST))
            }
        };
        self.stage = stage;
        StepOutcome::Continue(reply)
    }

    fn on_title(&mut self, input: WizardInput<'_>, now: NaiveDateTime) -> StepOutcome {
        let WizardInput::Text(text) = input else {
            return StepOutcome::Continue(Reply::entry(PROMPT_TITLE));
        };
        if sanitize_input(text).chars().count() > TITLE_LIMIT {
            return StepOutcome::Continue(Reply::wizard(MSG_TITLE_TOO_LONG));
        }
        self.draft.title = Some(text.to_string());
        self.stage = Stage::Date;
        StepOutcome::Continue(Reply::wizard(date_prompt(now)))
    }

    fn on_title_from_post(&mut self, input: WizardInput<'_>) -> StepOutcome {
        let WizardInput::Text(text) = input else {
            return StepOutcome::Continue(Reply::entry(PROMPT_TITLE_FROM_POST));
        };
        if sanitize_input(text).chars().count() > TITLE_LIMIT {
            return StepOutcome::Continue(Reply::wizard(MSG_TITLE_TOO_LONG));
        }
        self.draft.title = Some(text.to_string());
        self.stage = Stage::ParseFromPost;
        StepOutcome::Continue(Reply::wizard(PROMPT_POST))
    }

    fn on_date(&mut self, input: WizardInput<'_>, now: NaiveDateTime) -> StepOutcome {
        let WizardInput::Text(text) = input else {
            return StepOutcome::Continue(Reply::wizard(date_error_prompt(now)));
        };
        match parse_date(text) {
            Ok(date) => {
                self.draft.date = Some(date);
                self.stage = Stage::EndLocation;
                StepOutcome::Continue(Reply::wizard(PROMPT_END_LOCATION))
            }
            Err(_) => StepOutcome::Continue(Reply::wizard(date_error_prompt(now))),
        }
    }

    /// Fast path: one message carrying date, location and description on
    /// separate lines. An unparseable date degrades to the manual Date
    /// stage instead of failing the conversation.
    fn on_parse_from_post(&mut self, input: WizardInput<'_>, now: NaiveDateTime) -> StepOutcome {
        let WizardInput::Text(text) = input else {
            return StepOutcome::Continue(Reply::wizard(PROMPT_POST));
        };
        let post = sanitize_input(text);
        if post.chars().count() > CAPTION_LIMIT {
            return StepOutcome::Continue(Reply::wizard(MSG_POST_TOO_LONG));
        }

        let lines: Vec<&str> = post
            .split('\n')
            .map(str::trim)
            .filter(|line| line.chars().count() > 1)
            .collect();

        let date = match lines.first().copied().map(parse_date) {
            Some(Ok(date)) => date,
            _ => {
                self.stage = Stage::Date;
                return StepOutcome::Continue(Reply::wizard(post_fallback_prompt(now)));
            }
        };
        let Some(&location_line) = lines.get(1) else {
            return StepOutcome::Continue(Reply::wizard(PROMPT_POST));
        };
        let end_location = location_line.strip_prefix('📍').unwrap_or(location_line);
        let description = lines[2..].join("\n");
        if description.chars().count() > CAPTION_LIMIT {
            return StepOutcome::Continue(Reply::wizard(MSG_DESCRIPTION_TOO_LONG));
        }

        self.draft.date = Some(date);
        self.draft.end_location = Some(end_location.to_string());
        self.draft.description = Some(description);
        self.stage = Stage::Price;
        StepOutcome::Continue(Reply::wizard(PROMPT_PRICE))
    }

    fn on_end_location(&mut self, input: WizardInput<'_>) -> StepOutcome {
        let WizardInput::Text(text) = input else {
            return StepOutcome::Continue(Reply::wizard(PROMPT_END_LOCATION));
        };
        self.draft.end_location = Some(sanitize_input(text));
        self.stage = Stage::Description;
        StepOutcome::Continue(Reply::wizard(PROMPT_DESCRIPTION))
    }

    fn on_description(&mut self, input: WizardInput<'_>) -> StepOutcome {
        let WizardInput::Text(text) = input else {
            return StepOutcome::Continue(Reply::wizard(PROMPT_DESCRIPTION));
        };
        self.draft.description = Some(sanitize_input(text));
        self.stage = Stage::Price;
        StepOutcome::Continue(Reply::wizard(PROMPT_PRICE))
    }

    fn on_price(&mut self, input: WizardInput<'_>) -> StepOutcome {
        match parse_price(&input) {
            Some(price) => {
                self.draft.price = Some(price);
                self.stage = Stage::Photo;
                StepOutcome::Continue(Reply::wizard(PROMPT_PHOTO))
            }
            None => StepOutcome::Continue(Reply::wizard(MSG_PRICE_INVALID)),
        }
    }

    fn on_photo(&mut self, input: WizardInput<'_>, media_dir: &Path) -> StepOutcome {
        let WizardInput::Photo(photo) = input else {
            return StepOutcome::Continue(Reply::wizard(PROMPT_PHOTO));
        };
        let extension = Path::new(&photo.file_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let stem = sanitize_input(self.draft.title.as_deref().unwrap_or_default())
            .replace(' ', "_");
        let dest = media_dir.join(format!("event_{stem}{extension}"));

        self.draft.image_path = Some(dest.to_string_lossy().into_owned());
        self.stage = Stage::TransferOption;
        StepOutcome::FetchPhoto {
            file_id: photo.file_id.clone(),
            dest,
            reply: Reply::wizard(PROMPT_TRANSFER_OPTION),
        }
    }

    fn on_transfer_option(&mut self, input: WizardInput<'_>) -> StepOutcome {
        let WizardInput::Text(text) = input else {
            return StepOutcome::Continue(Reply::wizard(PROMPT_TRANSFER_OPTION));
        };
        if text.eq_ignore_ascii_case("yes") {
            self.stage = Stage::StartLocation;
            StepOutcome::Continue(Reply::wizard(PROMPT_START_LOCATION))
        } else if text.eq_ignore_ascii_case("no") {
            self.commit(None)
        } else {
            StepOutcome::Continue(Reply::wizard(MSG_YES_NO))
        }
    }

    fn on_start_location(&mut self, input: WizardInput<'_>, now: NaiveDateTime) -> StepOutcome {
        let WizardInput::Text(text) = input else {
            return StepOutcome::Continue(Reply::wizard(PROMPT_START_LOCATION));
        };
        self.draft.start_location = Some(sanitize_input(text));
        self.stage = Stage::TransferTime;
        StepOutcome::Continue(Reply::wizard(transfer_time_prompt(now)))
    }

    fn on_transfer_time(&mut self, input: WizardInput<'_>, now: NaiveDateTime) -> StepOutcome {
        let WizardInput::Text(text) = input else {
            return StepOutcome::Continue(Reply::wizard(transfer_time_prompt(now)));
        };
        match parse_date(text) {
            Ok(departure) => {
                self.draft.transfer_time = Some(departure);
                self.stage = Stage::TransferPrice;
                StepOutcome::Continue(Reply::wizard(PROMPT_TRANSFER_PRICE))
            }
            Err(_) => StepOutcome::Continue(Reply::wizard(date_error_prompt(now))),
        }
    }

    fn on_transfer_price(&mut self, input: WizardInput<'_>) -> StepOutcome {
        let Some(price) = parse_price(&input) else {
            return StepOutcome::Continue(Reply::wizard(MSG_TRANSFER_PRICE_INVALID));
        };
        self.draft.transfer_price = Some(price);
        let leg = match (&self.draft.start_location, self.draft.transfer_time) {
            (Some(start_location), Some(departure)) => Some(TransferLeg {
                start_location: start_location.clone(),
                departure,
                price,
            }),
            // StartLocation and TransferTime always run before this stage.
            _ => return StepOutcome::Cancelled(Reply::menu(MSG_CANCELLED)),
        };
        self.commit(leg)
    }

    fn commit(&mut self, transfer: Option<TransferLeg>) -> StepOutcome {
        let draft = &self.draft;
        match (
            draft.title.clone(),
            draft.date,
            draft.end_location.clone(),
            draft.description.clone(),
            draft.price,
        ) {
            (Some(title), Some(date), Some(end_location), Some(description), Some(price)) => {
                StepOutcome::Commit(Box::new(NewEvent {
                    title,
                    description,
                    price,
                    image_path: draft.image_path.clone(),
                    end_location,
                    date,
                    transfer,
                }))
            }
            // Each earlier stage fills its slot before this one is reachable.
            _ => StepOutcome::Cancelled(Reply::menu(MSG_CANCELLED)),
        }
    }
}

fn parse_price(input: &WizardInput<'_>) -> Option<i64> {
    let WizardInput::Text(text) = input else {
        return None;
    };
    sanitize_input(text)
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|price| *price >= MIN_PRICE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx() -> StepContext<'static> {
        StepContext {
            now: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            media_dir: Path::new("event_images"),
        }
    }

    fn text_step(conversation: &mut Conversation, text: &str) -> StepOutcome {
        conversation.step(WizardInput::Text(text), &ctx())
    }

    fn photo_step(conversation: &mut Conversation, file_name: &str) -> StepOutcome {
        let photo = PhotoAttachment {
            file_id: "file-1".to_string(),
            file_name: file_name.to_string(),
        };
        conversation.step(WizardInput::Photo(&photo), &ctx())
    }

    /// Walks the manual path up to the transfer question.
    fn conversation_at_transfer_option() -> Conversation {
        let (mut conversation, _) = Conversation::manual();
        text_step(&mut conversation, "Concerto");
        text_step(&mut conversation, "31/12/2025 20:00");
        text_step(&mut conversation, "Piazza");
        text_step(&mut conversation, "desc");
        text_step(&mut conversation, "1500");
        photo_step(&mut conversation, "poster.jpg");
        assert_eq!(conversation.stage(), Stage::TransferOption);
        conversation
    }

    #[test]
    fn test_manual_path_commits_without_transfer() {
        let mut conversation = conversation_at_transfer_option();
        let outcome = text_step(&mut conversation, "no");

        let StepOutcome::Commit(event) = outcome else {
            panic!("expected commit, got {outcome:?}");
        };
        assert_eq!(event.title, "Concerto");
        assert_eq!(event.end_location, "Piazza");
        assert_eq!(event.description, "desc");
        assert_eq!(event.price, 1500);
        assert_eq!(format_date(event.date), "31/12/2025 20:00");
        assert_eq!(
            event.image_path.as_deref(),
            Some("event_images/event_Concerto.jpg")
        );
        assert!(event.transfer.is_none());
    }

    #[test]
    fn test_transfer_branch_commits_a_complete_leg() {
        let mut conversation = conversation_at_transfer_option();
        text_step(&mut conversation, "YES");
        text_step(&mut conversation, "Stazione");
        text_step(&mut conversation, "31/12/2025 18:30");
        let outcome = text_step(&mut conversation, "500");

        let StepOutcome::Commit(event) = outcome else {
            panic!("expected commit, got {outcome:?}");
        };
        let leg = event.transfer.expect("transfer leg");
        assert_eq!(leg.start_location, "Stazione");
        assert_eq!(leg.price, 500);
        assert_eq!(format_date(leg.departure), "31/12/2025 18:30");
    }

    #[test]
    fn test_overlong_title_reprompts_in_place() {
        let (mut conversation, _) = Conversation::manual();
        let outcome = text_step(&mut conversation, &"x".repeat(101));

        assert!(matches!(outcome, StepOutcome::Continue(_)));
        assert_eq!(conversation.stage(), Stage::Title);
        assert!(conversation.draft().title.is_none());
    }

    #[test]
    fn test_bad_date_reprompts_with_an_example() {
        let (mut conversation, _) = Conversation::manual();
        text_step(&mut conversation, "Concerto");
        let outcome = text_step(&mut conversation, "domani sera");

        let StepOutcome::Continue(reply) = outcome else {
            panic!("expected re-prompt");
        };
        assert!(reply.text.contains("01/06/2025 12:00"));
        assert_eq!(conversation.stage(), Stage::Date);
    }

    #[test]
    fn test_price_below_one_euro_is_rejected() {
        let (mut conversation, _) = Conversation::manual();
        text_step(&mut conversation, "Concerto");
        text_step(&mut conversation, "31/12/2025 20:00");
        text_step(&mut conversation, "Piazza");
        text_step(&mut conversation, "desc");

        text_step(&mut conversation, "99");
        assert_eq!(conversation.stage(), Stage::Price);
        text_step(&mut conversation, "caro");
        assert_eq!(conversation.stage(), Stage::Price);

        text_step(&mut conversation, "100");
        assert_eq!(conversation.stage(), Stage::Photo);
    }

    #[test]
    fn test_photo_path_derives_from_sanitized_title() {
        let (mut conversation, _) = Conversation::manual();
        text_step(&mut conversation, "Gran Gala");
        text_step(&mut conversation, "31/12/2025 20:00");
        text_step(&mut conversation, "Piazza");
        text_step(&mut conversation, "desc");
        text_step(&mut conversation, "1500");
        let outcome = photo_step(&mut conversation, "poster.png");

        let StepOutcome::FetchPhoto { file_id, dest, .. } = outcome else {
            panic!("expected photo fetch");
        };
        assert_eq!(file_id, "file-1");
        assert_eq!(dest, PathBuf::from("event_images/event_Gran_Gala.png"));
        assert_eq!(conversation.stage(), Stage::TransferOption);
    }

    #[test]
    fn test_text_at_photo_stage_reprompts() {
        let (mut conversation, _) = Conversation::manual();
        text_step(&mut conversation, "Concerto");
        text_step(&mut conversation, "31/12/2025 20:00");
        text_step(&mut conversation, "Piazza");
        text_step(&mut conversation, "desc");
        text_step(&mut conversation, "1500");

        let outcome = text_step(&mut conversation, "eccola");
        assert!(matches!(outcome, StepOutcome::Continue(_)));
        assert_eq!(conversation.stage(), Stage::Photo);
    }

    #[test]
    fn test_unclear_transfer_answer_reprompts() {
        let mut conversation = conversation_at_transfer_option();
        let outcome = text_step(&mut conversation, "boh");

        let StepOutcome::Continue(reply) = outcome else {
            panic!("expected re-prompt");
        };
        assert_eq!(reply.text, MSG_YES_NO);
        assert_eq!(conversation.stage(), Stage::TransferOption);
    }

    #[test]
    fn test_parse_from_post_extracts_all_fields() {
        let (mut conversation, _) = Conversation::from_post();
        text_step(&mut conversation, "Concerto");
        assert_eq!(conversation.stage(), Stage::ParseFromPost);

        text_step(&mut conversation, "31/12/2025 20:00\n📍Piazza\nBella serata");

        assert_eq!(conversation.stage(), Stage::Price);
        let draft = conversation.draft();
        assert_eq!(format_date(draft.date.unwrap()), "31/12/2025 20:00");
        assert_eq!(draft.end_location.as_deref(), Some("Piazza"));
        assert_eq!(draft.description.as_deref(), Some("Bella serata"));
    }

    #[test]
    fn test_post_keeps_location_without_pin_glyph() {
        let (mut conversation, _) = Conversation::from_post();
        text_step(&mut conversation, "Concerto");
        text_step(&mut conversation, "31/12/2025 20:00\nPiazza Grande\nBella serata");

        assert_eq!(
            conversation.draft().end_location.as_deref(),
            Some("Piazza Grande")
        );
    }

    #[test]
    fn test_post_with_bad_date_falls_back_to_manual_date() {
        let (mut conversation, _) = Conversation::from_post();
        text_step(&mut conversation, "Concerto");
        let outcome = text_step(&mut conversation, "un giorno di questi\n📍Piazza\ndesc");

        let StepOutcome::Continue(reply) = outcome else {
            panic!("expected fallback prompt");
        };
        assert!(reply.text.contains("inserimento manuale"));
        assert_eq!(conversation.stage(), Stage::Date);
        // The title survives the fallback.
        assert_eq!(conversation.draft().title.as_deref(), Some("Concerto"));
    }

    #[test]
    fn test_oversized_post_reprompts() {
        let (mut conversation, _) = Conversation::from_post();
        text_step(&mut conversation, "Concerto");
        let long_post = format!("31/12/2025 20:00\n📍Piazza\n{}", "x".repeat(900));
        let outcome = text_step(&mut conversation, &long_post);

        let StepOutcome::Continue(reply) = outcome else {
            panic!("expected re-prompt");
        };
        assert_eq!(reply.text, MSG_POST_TOO_LONG);
        assert_eq!(conversation.stage(), Stage::ParseFromPost);
    }

    #[test]
    fn test_cancel_discards_from_any_stage() {
        let mut conversation = conversation_at_transfer_option();
        let outcome = text_step(&mut conversation, menus::CANCEL);

        let StepOutcome::Cancelled(reply) = outcome else {
            panic!("expected cancellation");
        };
        assert_eq!(reply.text, MSG_CANCELLED);
        assert_eq!(reply.keyboard, menus::main_keyboard());
    }

    #[test]
    fn test_back_preserves_collected_fields() {
        let (mut conversation, _) = Conversation::manual();
        text_step(&mut conversation, "Concerto");
        text_step(&mut conversation, "31/12/2025 20:00");
        text_step(&mut conversation, "Piazza");
        assert_eq!(conversation.stage(), Stage::Description);

        text_step(&mut conversation, menus::BACK);
        assert_eq!(conversation.stage(), Stage::EndLocation);
        assert_eq!(conversation.draft().title.as_deref(), Some("Concerto"));
        assert!(conversation.draft().date.is_some());

        text_step(&mut conversation, "Arena");
        assert_eq!(conversation.draft().end_location.as_deref(), Some("Arena"));
        assert_eq!(conversation.stage(), Stage::Description);
    }

    #[test]
    fn test_back_at_entry_state_stays_put() {
        let (mut conversation, _) = Conversation::manual();
        let outcome = text_step(&mut conversation, menus::BACK);

        assert!(matches!(outcome, StepOutcome::Continue(_)));
        assert_eq!(conversation.stage(), Stage::Title);
    }

    #[test]
    fn test_stored_description_is_sanitized() {
        let (mut conversation, _) = Conversation::manual();
        text_step(&mut conversation, "Concerto");
        text_step(&mut conversation, "31/12/2025 20:00");
        text_step(&mut conversation, "Piazza");
        text_step(&mut conversation, "gran <b>festa</b>");

        assert_eq!(
            conversation.draft().description.as_deref(),
            Some("gran &lt;b&gt;festa&lt;/b&gt;")
        );
    }
}
