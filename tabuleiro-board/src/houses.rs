//! House catalog
//!
//! The board is a fixed, ordered sequence of houses with dense ids starting
//! at 1. A progress pointer one past the last house means the board is
//! complete.

use serde::Serialize;

/// Number of houses on the board
pub const HOUSE_COUNT: i64 = 20;

/// First house every learner starts on
pub const FIRST_HOUSE_ID: i64 = 1;

/// Progress pointer value meaning every house has been passed
pub const COMPLETED_HOUSE_ID: i64 = HOUSE_COUNT + 1;

/// One lesson on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct House {
    pub id: i64,
    pub title: &'static str,
    pub objective: &'static str,
}

const fn house(id: i64, title: &'static str, objective: &'static str) -> House {
    House { id, title, objective }
}

static HOUSES: [House; HOUSE_COUNT as usize] = [
    house(1, "Casa 1: Fundamentos do Algoritmo", "Explique como o algoritmo do TikTok prioriza conteúdo nos primeiros 3 segundos"),
    house(2, "Casa 2: Hook Magnético", "Crie um hook que gere curiosidade sem revelar a solução"),
    house(3, "Casa 3: Retenção Visual", "Descreva 3 técnicas para manter o espectador até o final"),
    house(4, "Casa 4: Gatilhos Emocionais", "Identifique os 4 gatilhos emocionais mais eficazes para viralização"),
    house(5, "Casa 5: Edição Estratégica", "Explique a técnica de cortes rápidos e quando NÃO usá-la"),
    house(6, "Casa 6: Trending Sounds", "Como escolher um som trending que se alinha com sua mensagem"),
    house(7, "Casa 7: CTA Invisível", "Crie um call-to-action que não pareça vendedor"),
    house(8, "Casa 8: Storytelling em 15s", "Estruture uma história completa em 15 segundos"),
    house(9, "Casa 9: Timing de Postagem", "Explique por que timing importa menos do que consistência"),
    house(10, "Casa 10: Análise de Métricas", "Quais 3 métricas realmente importam e por quê"),
    house(11, "Casa 11: Nicho vs. Amplitude", "Quando estreitar e quando expandir seu conteúdo"),
    house(12, "Casa 12: Comentários Estratégicos", "Como usar comentários para aumentar engajamento"),
    house(13, "Casa 13: Thumbnail Psychology", "Elementos visuais que aumentam CTR em 40%"),
    house(14, "Casa 14: Batching de Conteúdo", "Sistema para criar 30 vídeos em 4 horas"),
    house(15, "Casa 15: Monetização Inicial", "3 formas de monetizar com menos de 10k seguidores"),
    house(16, "Casa 16: Colaborações Estratégicas", "Como escolher parceiros que multiplicam seu alcance"),
    house(17, "Casa 17: Conteúdo Evergreen", "Crie conteúdo que gera views por 6+ meses"),
    house(18, "Casa 18: Scaling Systems", "Estrutura para crescer de 10k para 100k em 60 dias"),
    house(19, "Casa 19: Brand Building", "Transforme audiência em comunidade leal"),
    house(20, "Casa 20: Monetização Avançada", "Estratégias para gerar R$10k+/mês com TikTok"),
];

/// Look up a house by id
pub fn lookup(house_id: i64) -> Option<&'static House> {
    if !is_valid_house_id(house_id) {
        return None;
    }
    HOUSES.get((house_id - FIRST_HOUSE_ID) as usize)
}

/// The full catalog in board order
pub fn all() -> &'static [House] {
    &HOUSES
}

/// Whether `house_id` names a house on the board
pub fn is_valid_house_id(house_id: i64) -> bool {
    (FIRST_HOUSE_ID..=HOUSE_COUNT).contains(&house_id)
}

/// Where a learner stands on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Must answer this house next
    InProgress(i64),
    /// Every house passed (terminal)
    Completed,
}

impl Stage {
    /// Derive the stage from a progress pointer
    pub fn from_pointer(current_house_id: i64) -> Self {
        if current_house_id > HOUSE_COUNT {
            Stage::Completed
        } else {
            Stage::InProgress(current_house_id)
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, Stage::Completed)
    }
}
